use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::dto::assignment_dto::{AssignTestRequest, AssignedTestSummary, AssignmentListItem};
use crate::error::{Error, Result};
use crate::models::assignment::TestAssignment;

#[derive(Clone)]
pub struct AssignmentService {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct AssignmentWithTestRow {
    id: Uuid,
    test_id: Uuid,
    assigned_by: Uuid,
    status: String,
    due_date: DateTime<Utc>,
    // NULL when the referenced test has been deleted out from under the row.
    joined_test_id: Option<Uuid>,
    title: Option<String>,
    description: Option<String>,
    duration_minutes: Option<i32>,
    passing_score: Option<i32>,
}

impl AssignmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn assign(
        &self,
        req: AssignTestRequest,
        assigned_by: Uuid,
    ) -> Result<TestAssignment> {
        if !req.has_valid_target() {
            return Err(Error::BadRequest(
                "Specify either a department or a non-empty list of users".to_string(),
            ));
        }
        if req.due_date <= Utc::now() {
            return Err(Error::BadRequest(
                "Due date must be in the future".to_string(),
            ));
        }

        let test_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tests WHERE id = $1)")
            .bind(req.test_id)
            .fetch_one(&self.pool)
            .await?;
        if !test_exists {
            return Err(Error::NotFound("Test not found".to_string()));
        }

        let assigned_to = if req.has_user_target() {
            req.assigned_to.clone()
        } else {
            None
        };
        let department = if req.has_department_target() {
            req.department.as_deref().map(|d| d.trim().to_string())
        } else {
            None
        };

        let assignment = sqlx::query_as::<_, TestAssignment>(
            r#"
            INSERT INTO test_assignments (test_id, assigned_by, assigned_to, department, due_date, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING *
            "#,
        )
        .bind(req.test_id)
        .bind(assigned_by)
        .bind(assigned_to)
        .bind(department)
        .bind(req.due_date)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            assignment_id = %assignment.id,
            test_id = %assignment.test_id,
            "test assigned"
        );
        Ok(assignment)
    }

    /// Assignments visible to a user: directly assigned rows plus pending
    /// rows targeting their department. Rows whose test has been deleted are
    /// dropped from the response and logged as a data-integrity warning.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        department: Option<&str>,
    ) -> Result<Vec<AssignmentListItem>> {
        let rows = sqlx::query_as::<_, AssignmentWithTestRow>(
            r#"
            SELECT a.id, a.test_id, a.assigned_by, a.status, a.due_date,
                   t.id AS joined_test_id, t.title, t.description,
                   t.duration_minutes, t.passing_score
            FROM test_assignments a
            LEFT JOIN tests t ON t.id = a.test_id
            WHERE ($1 = ANY(a.assigned_to))
               OR ($2::text IS NOT NULL AND a.department = $2 AND a.status = 'pending')
            ORDER BY a.due_date ASC
            "#,
        )
        .bind(user_id)
        .bind(department)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            if row.joined_test_id.is_none() {
                tracing::warn!(
                    assignment_id = %row.id,
                    test_id = %row.test_id,
                    "assignment references a missing test; hiding it from the listing"
                );
                continue;
            }
            items.push(AssignmentListItem {
                id: row.id,
                test_id: row.test_id,
                status: row.status,
                due_date: row.due_date,
                assigned_by: row.assigned_by,
                test: AssignedTestSummary {
                    title: row.title.unwrap_or_default(),
                    description: row.description,
                    duration_minutes: row.duration_minutes.unwrap_or_default(),
                    passing_score: row.passing_score.unwrap_or_default(),
                },
            });
        }
        Ok(items)
    }

    /// Marks every pending assignment matching this user (directly or via
    /// department) as completed. Idempotent: completed and expired rows are
    /// never touched. Takes an executor so the submit path can run it inside
    /// its transaction.
    pub async fn complete_for<'e, E>(
        executor: E,
        user_id: Uuid,
        department: Option<&str>,
        test_id: Uuid,
    ) -> Result<u64>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE test_assignments
            SET status = 'completed', updated_at = NOW()
            WHERE test_id = $1 AND status = 'pending'
              AND ($2 = ANY(assigned_to) OR ($3::text IS NOT NULL AND department = $3))
            "#,
        )
        .bind(test_id)
        .bind(user_id)
        .bind(department)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lazily transitions overdue pending rows to expired. There is no
    /// background sweeper; this runs when a late submission is attempted.
    pub async fn expire_overdue_for<'e, E>(
        executor: E,
        user_id: Uuid,
        department: Option<&str>,
        test_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE test_assignments
            SET status = 'expired', updated_at = NOW()
            WHERE test_id = $1 AND status = 'pending' AND due_date <= $4
              AND ($2 = ANY(assigned_to) OR ($3::text IS NOT NULL AND department = $3))
            "#,
        )
        .bind(test_id)
        .bind(user_id)
        .bind(department)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
