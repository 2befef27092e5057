use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use crate::auth::AuthSession;
use crate::employees::service::{register_employee, update_own_profile, RegisterEmployeeRequest};
use crate::errors::AppError;
use crate::models::cadre::Cadre;
use crate::models::employee::{EmployeeProfile, ProfileUpdate};
use crate::state::AppState;
use crate::store::RegisteredEmployee;

/// GET /api/v1/cadres
pub async fn handle_list_cadres(
    State(state): State<AppState>,
    AuthSession(_): AuthSession,
) -> Result<Json<Vec<Cadre>>, AppError> {
    Ok(Json(state.employees.list_cadres().await?))
}

/// POST /api/v1/employees
pub async fn handle_register_employee(
    State(state): State<AppState>,
    AuthSession(actor): AuthSession,
    Json(req): Json<RegisterEmployeeRequest>,
) -> Result<(StatusCode, Json<RegisteredEmployee>), AppError> {
    let registered = register_employee(
        state.employees.as_ref(),
        &actor,
        &req,
        state.auth.bcrypt_cost(),
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

/// PATCH /api/v1/employees/me
pub async fn handle_update_own_profile(
    State(state): State<AppState>,
    AuthSession(actor): AuthSession,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<EmployeeProfile>, AppError> {
    let profile =
        update_own_profile(state.employees.as_ref(), &actor, &update, Utc::now()).await?;
    Ok(Json(profile))
}
