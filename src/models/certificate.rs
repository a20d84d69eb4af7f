use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_EXPIRED: &str = "expired";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_id: Uuid,
    pub test_result_id: Uuid,
    pub certificate_number: String,
    pub score: i32,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Stored status overridden by the expiry window. Rows are not rewritten
    /// when they lapse; readers compute the effective status instead.
    pub fn effective_status(&self, now: DateTime<Utc>) -> &str {
        if self.expiry_date <= now {
            STATUS_EXPIRED
        } else {
            &self.status
        }
    }
}
