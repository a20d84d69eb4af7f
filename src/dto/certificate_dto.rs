use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCertificateRequest {
    pub test_result_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateDetail {
    pub id: Uuid,
    pub certificate_number: String,
    pub test_id: Uuid,
    pub test_result_id: Uuid,
    pub score: i32,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: String,
    pub test_title: Option<String>,
    pub test_description: Option<String>,
}
