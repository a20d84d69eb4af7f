use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::test_dto::{SubmitTestRequest, SubmitTestResponse, TakeTestResponse};
use crate::error::{Error, Result};
use crate::models::assignment::TestAssignment;
use crate::models::test::Test;
use crate::models::test_result::TestResult;
use crate::services::assignment_service::AssignmentService;
use crate::services::grading_service::GradingService;

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serves test content for taking, with the answer key stripped.
    /// Requires a pending assignment for the caller; a completed assignment
    /// is reported distinctly so the UI can say "already done" instead of a
    /// bare denial.
    pub async fn get_test_for_taking(
        &self,
        user_id: Uuid,
        department: Option<&str>,
        test_id: Uuid,
    ) -> Result<TakeTestResponse> {
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;

        if !self
            .has_assignment_with_status(user_id, department, test_id, "pending")
            .await?
        {
            return Err(self
                .no_pending_assignment_error(user_id, department, test_id)
                .await?);
        }

        let questions = test.parsed_questions()?;
        Ok(TakeTestResponse {
            id: test.id,
            title: test.title,
            description: test.description,
            duration_minutes: test.duration_minutes,
            total_questions: questions.len(),
            questions: questions.iter().map(|q| q.for_taking()).collect(),
        })
    }

    /// Scores a submission and finalizes the assignment in one transaction.
    ///
    /// The pending rows are locked with FOR UPDATE, so two near-simultaneous
    /// submissions serialize: the second sees no pending row and is rejected
    /// with Forbidden, never producing a second result.
    pub async fn submit_answers(
        &self,
        user_id: Uuid,
        department: Option<&str>,
        test_id: Uuid,
        req: SubmitTestRequest,
    ) -> Result<SubmitTestResponse> {
        let answers = req
            .answers
            .ok_or_else(|| Error::BadRequest("answers are required".to_string()))?;
        let time_spent_seconds = match req.time_spent_seconds {
            Some(t) if t >= 0 => i32::try_from(t).unwrap_or(i32::MAX),
            _ => {
                return Err(Error::BadRequest(
                    "time_spent_seconds must be a non-negative number".to_string(),
                ))
            }
        };

        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query_as::<_, TestAssignment>(
            r#"
            SELECT * FROM test_assignments
            WHERE test_id = $1 AND status = 'pending'
              AND ($2 = ANY(assigned_to) OR ($3::text IS NOT NULL AND department = $3))
            FOR UPDATE
            "#,
        )
        .bind(test_id)
        .bind(user_id)
        .bind(department)
        .fetch_all(&mut *tx)
        .await?;

        if pending.is_empty() {
            tx.rollback().await?;
            return Err(self
                .no_pending_assignment_error(user_id, department, test_id)
                .await?);
        }

        let now = Utc::now();
        if pending.iter().all(|a| a.due_date <= now) {
            // Every matching row is overdue: lazy-expire them and reject the
            // late submission.
            let expired =
                AssignmentService::expire_overdue_for(&mut *tx, user_id, department, test_id, now)
                    .await?;
            tx.commit().await?;
            tracing::info!(
                user_id = %user_id,
                test_id = %test_id,
                expired,
                "rejected late submission; assignments expired"
            );
            return Err(Error::Forbidden(
                "The assignment due date has passed".to_string(),
            ));
        }

        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(test_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;

        let questions = test.parsed_questions()?;
        let outcome = GradingService::score_submission(&questions, &answers);
        let passed = outcome.score >= test.passing_score;

        let result = sqlx::query_as::<_, TestResult>(
            r#"
            INSERT INTO test_results (user_id, test_id, answers, score, time_spent_seconds, passed, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(test_id)
        .bind(serde_json::to_value(&answers)?)
        .bind(outcome.score)
        .bind(time_spent_seconds)
        .bind(passed)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let completed =
            AssignmentService::complete_for(&mut *tx, user_id, department, test_id).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            test_id = %test_id,
            result_id = %result.id,
            score = outcome.score,
            passed,
            assignments_completed = completed,
            "test submitted"
        );

        Ok(SubmitTestResponse {
            score: outcome.score,
            passed,
            result_id: result.id,
        })
    }

    async fn has_assignment_with_status(
        &self,
        user_id: Uuid,
        department: Option<&str>,
        test_id: Uuid,
        status: &str,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM test_assignments
                WHERE test_id = $1 AND status = $4
                  AND ($2 = ANY(assigned_to) OR ($3::text IS NOT NULL AND department = $3))
            )
            "#,
        )
        .bind(test_id)
        .bind(user_id)
        .bind(department)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn no_pending_assignment_error(
        &self,
        user_id: Uuid,
        department: Option<&str>,
        test_id: Uuid,
    ) -> Result<Error> {
        if self
            .has_assignment_with_status(user_id, department, test_id, "completed")
            .await?
        {
            return Ok(Error::Forbidden(
                "You have already completed this test".to_string(),
            ));
        }
        Ok(Error::Forbidden(
            "You are not assigned to this test".to_string(),
        ))
    }
}
