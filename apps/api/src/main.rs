mod auth;
mod config;
mod db;
mod employees;
mod errors;
mod models;
mod routes;
mod state;
mod store;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::delivery::HttpMailer;
use crate::auth::otp::OtpPolicy;
use crate::auth::{Authenticator, SessionIssuer};
use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting GEMS API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize OTP mail transport
    let mailer = Arc::new(HttpMailer::new(
        config.mail_api_url.clone(),
        config.mail_api_key.clone(),
        config.mail_from.clone(),
    )?);
    info!("Mail transport initialized ({})", config.mail_api_url);

    let policy = OtpPolicy {
        ttl: chrono::Duration::minutes(config.otp_ttl_minutes),
        max_attempts: config.otp_max_attempts,
        exempt_roles: config.otp_exempt_roles.iter().copied().collect::<HashSet<_>>(),
    };
    info!(
        "OTP policy: ttl={}m max_attempts={} exempt={:?}",
        config.otp_ttl_minutes, config.otp_max_attempts, config.otp_exempt_roles
    );

    let sessions = SessionIssuer::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.session_ttl_hours),
    );

    let auth = Arc::new(Authenticator::new(
        store.clone(),
        mailer,
        policy,
        sessions,
        config.bcrypt_cost,
    ));
    auth.prepare().await?;

    // Build app state
    let state = AppState {
        auth,
        employees: store,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict CORS to the GEMS web origin
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
