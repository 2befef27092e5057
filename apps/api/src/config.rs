use anyhow::{bail, Context, Result};

use crate::auth::otp::{DEFAULT_OTP_MAX_ATTEMPTS, DEFAULT_OTP_TTL_MINUTES};
use crate::auth::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::auth::session::DEFAULT_SESSION_TTL_HOURS;
use crate::models::account::Role;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub port: u16,
    pub rust_log: String,
    pub otp_ttl_minutes: i64,
    pub otp_max_attempts: i32,
    pub otp_exempt_roles: Vec<Role>,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            mail_api_url: require_env("MAIL_API_URL")?,
            mail_api_key: require_env("MAIL_API_KEY")?,
            mail_from: require_env("MAIL_FROM")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            otp_ttl_minutes: parse_env("OTP_TTL_MINUTES", DEFAULT_OTP_TTL_MINUTES)?,
            otp_max_attempts: parse_env("OTP_MAX_ATTEMPTS", DEFAULT_OTP_MAX_ATTEMPTS)?,
            otp_exempt_roles: parse_roles(&std::env::var("OTP_EXEMPT_ROLES").unwrap_or_default())?,
            session_ttl_hours: parse_env("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?,
            bcrypt_cost: parse_env("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 bytes");
        }
        if self.otp_ttl_minutes <= 0 {
            bail!("OTP_TTL_MINUTES must be positive");
        }
        if self.otp_max_attempts <= 0 {
            bail!("OTP_MAX_ATTEMPTS must be positive");
        }
        if self.session_ttl_hours <= 0 {
            bail!("SESSION_TTL_HOURS must be positive");
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            bail!("BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}");
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Comma-separated role names, e.g. `ADMIN,DOP`.
fn parse_roles(raw: &str) -> Result<Vec<Role>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Role>().map_err(anyhow::Error::from))
        .collect()
}
