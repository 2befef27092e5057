use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An employment category. `next_sequence` is the sequence number the next
/// registered employee of this cadre will receive.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cadre {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub controlling_department: String,
    pub department_code: i32,
    pub next_sequence: i32,
    pub created_at: DateTime<Utc>,
}
