use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable record of one completed attempt. Written exactly once by the
/// submit transaction and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_id: Uuid,
    pub answers: JsonValue,
    pub score: i32,
    pub time_spent_seconds: i32,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
