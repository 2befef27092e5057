use std::sync::Arc;

use crate::auth::Authenticator;
use crate::store::EmployeeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
    pub employees: Arc<dyn EmployeeStore>,
}
