use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::web::access::AccessLevel;

#[derive(Clone, FromRow)]
pub struct ResearchAreaRow {
    pub id: Uuid,
    pub name: String,
    pub work_count: i64,
}

#[derive(Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub access_level: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn level(&self) -> AccessLevel {
        AccessLevel::from_stored(&self.access_level)
    }
}
