use chrono::{Datelike, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::certificate_dto::CertificateDetail;
use crate::error::{Error, Result};
use crate::models::certificate::Certificate;
use crate::models::test_result::TestResult;

/// Fixed validity window for every issued certificate.
pub const CERTIFICATE_VALIDITY_DAYS: i64 = 180;

#[derive(Clone)]
pub struct CertificateService {
    pool: PgPool,
}

impl CertificateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Mints a certificate for a passing result owned by the caller.
    ///
    /// Numbering uses a per-year counter advanced in its own committed
    /// statement, backed by UNIQUE indexes on certificate_number and
    /// test_result_id. A number collision triggers exactly one retry, and
    /// because the counter advance is never rolled back with a failed
    /// insert, the retry gets a genuinely fresh number. A duplicate result
    /// surfaces Conflict immediately.
    pub async fn issue(
        &self,
        user_id: Uuid,
        test_id: Uuid,
        result_id: Uuid,
    ) -> Result<Certificate> {
        let result = sqlx::query_as::<_, TestResult>("SELECT * FROM test_results WHERE id = $1")
            .bind(result_id)
            .fetch_optional(&self.pool)
            .await?;
        let result = match result {
            Some(r) if r.user_id == user_id && r.test_id == test_id => r,
            _ => return Err(Error::NotFound("Test result not found".to_string())),
        };
        if !result.passed {
            return Err(Error::BadRequest(
                "The test was not passed successfully".to_string(),
            ));
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_issue(&result).await {
                Ok(certificate) => {
                    tracing::info!(
                        certificate_id = %certificate.id,
                        certificate_number = %certificate.certificate_number,
                        user_id = %user_id,
                        "certificate issued"
                    );
                    return Ok(certificate);
                }
                Err(Error::Database(sqlx::Error::Database(db_err)))
                    if db_err.is_unique_violation() =>
                {
                    if db_err.constraint() == Some("certificates_result_key") {
                        return Err(Error::Conflict(
                            "A certificate has already been issued for this result".to_string(),
                        ));
                    }
                    if attempts >= 2 {
                        return Err(Error::Conflict(
                            "Could not allocate a unique certificate number".to_string(),
                        ));
                    }
                    tracing::warn!(
                        result_id = %result.id,
                        "certificate number collision, retrying with a new number"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_issue(&self, result: &TestResult) -> Result<Certificate> {
        let now = Utc::now();
        let year = now.year();
        // Committed on its own, apart from the insert below. A failed insert
        // must not roll the counter back, or a retry would be handed the
        // same number again. Numbers allocated to failed inserts leave gaps
        // in the sequence, which is fine.
        let sequence: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO certificate_sequences (year, last_value)
            VALUES ($1, 1)
            ON CONFLICT (year)
            DO UPDATE SET last_value = certificate_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        let certificate_number = format_certificate_number(year, sequence);
        let expiry_date = now + Duration::days(CERTIFICATE_VALIDITY_DAYS);

        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (
                user_id, test_id, test_result_id, certificate_number,
                score, issue_date, expiry_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active')
            RETURNING *
            "#,
        )
        .bind(result.user_id)
        .bind(result.test_id)
        .bind(result.id)
        .bind(&certificate_number)
        .bind(result.score)
        .bind(now)
        .bind(expiry_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(certificate)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CertificateDetail>> {
        let rows = sqlx::query_as::<_, CertificateWithTestRow>(
            r#"
            SELECT c.*, t.title AS test_title, t.description AS test_description
            FROM certificates c
            LEFT JOIN tests t ON t.id = c.test_id
            WHERE c.user_id = $1
            ORDER BY c.issue_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|r| r.into_detail(now)).collect())
    }

    /// Certificate detail for the owner. Rendering to a printable document is
    /// a client concern; this returns the data it needs.
    pub async fn get_for_download(
        &self,
        certificate_id: Uuid,
        requester_id: Uuid,
    ) -> Result<CertificateDetail> {
        let row = sqlx::query_as::<_, CertificateWithTestRow>(
            r#"
            SELECT c.*, t.title AS test_title, t.description AS test_description
            FROM certificates c
            LEFT JOIN tests t ON t.id = c.test_id
            WHERE c.id = $1
            "#,
        )
        .bind(certificate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Certificate not found".to_string()))?;

        if row.certificate.user_id != requester_id {
            return Err(Error::Forbidden(
                "You do not have access to this certificate".to_string(),
            ));
        }
        Ok(row.into_detail(Utc::now()))
    }

    /// Revocation deletes the row. Allowed for admins and the certificate
    /// owner.
    pub async fn revoke(
        &self,
        certificate_id: Uuid,
        requester_id: Uuid,
        requester_is_admin: bool,
    ) -> Result<()> {
        let certificate =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = $1")
                .bind(certificate_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Certificate not found".to_string()))?;

        if !requester_is_admin && certificate.user_id != requester_id {
            return Err(Error::Forbidden(
                "You do not have permission to revoke this certificate".to_string(),
            ));
        }

        sqlx::query("DELETE FROM certificates WHERE id = $1")
            .bind(certificate_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            certificate_id = %certificate_id,
            requester_id = %requester_id,
            "certificate revoked"
        );
        Ok(())
    }
}

pub fn format_certificate_number(year: i32, sequence: i32) -> String {
    format!("CERT-{}-{:04}", year, sequence)
}

#[derive(Debug, sqlx::FromRow)]
struct CertificateWithTestRow {
    #[sqlx(flatten)]
    certificate: Certificate,
    test_title: Option<String>,
    test_description: Option<String>,
}

impl CertificateWithTestRow {
    fn into_detail(self, now: chrono::DateTime<Utc>) -> CertificateDetail {
        let status = self.certificate.effective_status(now).to_string();
        CertificateDetail {
            id: self.certificate.id,
            certificate_number: self.certificate.certificate_number,
            test_id: self.certificate.test_id,
            test_result_id: self.certificate.test_result_id,
            score: self.certificate.score,
            issue_date: self.certificate.issue_date,
            expiry_date: self.certificate.expiry_date,
            status,
            test_title: self.test_title,
            test_description: self.test_description,
        }
    }
}
