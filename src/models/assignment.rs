use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One binding of a test to either a set of users or a department.
/// The storage layer enforces that exactly one target kind is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAssignment {
    pub id: Uuid,
    pub test_id: Uuid,
    pub assigned_by: Uuid,
    pub assigned_to: Option<Vec<Uuid>>,
    pub department: Option<String>,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
