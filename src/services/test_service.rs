use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::test_dto::{CreateQuestion, CreateTestRequest, PaginatedTests, UpdateTestRequest};
use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionKind};
use crate::models::test::Test;

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(&self, req: CreateTestRequest, created_by: Uuid) -> Result<Test> {
        let questions = build_questions(&req.questions)?;
        let questions_json = serde_json::to_value(&questions)?;

        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests (title, description, category, skill_level, questions,
                               duration_minutes, passing_score, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.category)
        .bind(&req.skill_level)
        .bind(questions_json)
        .bind(req.duration_minutes)
        .bind(req.passing_score)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(test_id = %test.id, created_by = %created_by, "test created");
        Ok(test)
    }

    pub async fn get_test_by_id(&self, test_id: Uuid) -> Result<Test> {
        sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))
    }

    pub async fn list_tests(&self, page: i64, per_page: i64) -> Result<PaginatedTests> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let offset = (page - 1) * per_page;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tests")
            .fetch_one(&self.pool)
            .await?;

        let tests = sqlx::query_as::<_, Test>(
            "SELECT * FROM tests ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_pages = (total + per_page - 1) / per_page;
        Ok(PaginatedTests {
            tests,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Partial update by the owner or an admin. Already-persisted results are
    /// untouched: they carry their own score and pass flag.
    pub async fn update_test(
        &self,
        test_id: Uuid,
        req: UpdateTestRequest,
        requester_id: Uuid,
        requester_is_admin: bool,
    ) -> Result<Test> {
        let existing = self.get_test_by_id(test_id).await?;
        if !requester_is_admin && existing.created_by != requester_id {
            return Err(Error::Forbidden(
                "You do not have permission to edit this test".to_string(),
            ));
        }

        let questions_json = match &req.questions {
            Some(questions) => {
                let built = build_questions(questions)?;
                Some(serde_json::to_value(&built)?)
            }
            None => None,
        };

        let test = sqlx::query_as::<_, Test>(
            r#"
            UPDATE tests
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                category = COALESCE($3, category),
                skill_level = COALESCE($4, skill_level),
                questions = COALESCE($5, questions),
                duration_minutes = COALESCE($6, duration_minutes),
                passing_score = COALESCE($7, passing_score),
                updated_at = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.category)
        .bind(&req.skill_level)
        .bind(questions_json)
        .bind(req.duration_minutes)
        .bind(req.passing_score)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(test)
    }

    /// Deletes the test and everything hanging off it in one transaction:
    /// assignments, results, certificates, then the test row itself.
    pub async fn delete_test(
        &self,
        test_id: Uuid,
        requester_id: Uuid,
        requester_is_admin: bool,
    ) -> Result<()> {
        let existing = self.get_test_by_id(test_id).await?;
        if !requester_is_admin && existing.created_by != requester_id {
            return Err(Error::Forbidden(
                "You do not have permission to delete this test".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM test_assignments WHERE test_id = $1")
            .bind(test_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM test_results WHERE test_id = $1")
            .bind(test_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM certificates WHERE test_id = $1")
            .bind(test_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(test_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(test_id = %test_id, "test and dependent records deleted");
        Ok(())
    }
}

/// Validates authoring invariants and assigns sequential question ids.
fn build_questions(questions: &[CreateQuestion]) -> Result<Vec<Question>> {
    questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let position = idx + 1;
            if q.text.trim().is_empty() {
                return Err(Error::BadRequest(format!(
                    "Question {} has no text",
                    position
                )));
            }
            if q.max_score <= 0 {
                return Err(Error::BadRequest(format!(
                    "Question {} must have a positive max score",
                    position
                )));
            }
            match q.kind {
                QuestionKind::MultipleChoice => {
                    if q.options.len() < 2 {
                        return Err(Error::BadRequest(format!(
                            "Question {} must have at least two options",
                            position
                        )));
                    }
                    let correct = q.options.iter().filter(|o| o.is_correct).count();
                    if correct != 1 {
                        return Err(Error::BadRequest(format!(
                            "Question {} must have exactly one correct option",
                            position
                        )));
                    }
                }
                QuestionKind::Essay => {
                    if q.sample_answer
                        .as_deref()
                        .map(|s| s.trim().is_empty())
                        .unwrap_or(true)
                    {
                        return Err(Error::BadRequest(format!(
                            "Question {} requires a sample answer",
                            position
                        )));
                    }
                }
            }
            Ok(Question {
                id: position as i32,
                kind: q.kind,
                text: q.text.clone(),
                options: if q.kind == QuestionKind::MultipleChoice {
                    q.options.clone()
                } else {
                    vec![]
                },
                sample_answer: if q.kind == QuestionKind::Essay {
                    q.sample_answer.clone()
                } else {
                    None
                },
                max_score: q.max_score,
            })
        })
        .collect()
}
