pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::employees::handlers as employees;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Authentication
        .route("/api/v1/auth/sign-in", post(auth::handle_sign_in))
        .route("/api/v1/auth/otp/resend", post(auth::handle_resend_otp))
        .route(
            "/api/v1/auth/password-reset",
            post(auth::handle_password_reset),
        )
        .route(
            "/api/v1/auth/password-reset/confirm",
            post(auth::handle_password_reset_confirm),
        )
        .route("/api/v1/auth/session", get(auth::handle_session))
        // Employees
        .route("/api/v1/cadres", get(employees::handle_list_cadres))
        .route(
            "/api/v1/employees",
            post(employees::handle_register_employee),
        )
        .route(
            "/api/v1/employees/me",
            patch(employees::handle_update_own_profile),
        )
        .with_state(state)
}
