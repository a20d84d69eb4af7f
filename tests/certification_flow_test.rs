use std::collections::HashMap;
use std::env;

use chrono::{Datelike, Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use skilltrack_backend::dto::assignment_dto::AssignTestRequest;
use skilltrack_backend::dto::test_dto::{CreateQuestion, CreateTestRequest, SubmitTestRequest};
use skilltrack_backend::error::Error;
use skilltrack_backend::models::question::{AnswerOption, QuestionKind};
use skilltrack_backend::AppState;

async fn setup() -> Option<AppState> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    };
    let pool: PgPool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to create test pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    Some(AppState::new(pool))
}

fn two_question_test() -> CreateTestRequest {
    CreateTestRequest {
        title: "Rust fundamentals".to_string(),
        description: Some("Ownership and borrowing".to_string()),
        category: Some("engineering".to_string()),
        skill_level: Some("intermediate".to_string()),
        questions: vec![
            CreateQuestion {
                kind: QuestionKind::MultipleChoice,
                text: "First question".to_string(),
                options: vec![
                    AnswerOption {
                        text: "A".to_string(),
                        is_correct: false,
                    },
                    AnswerOption {
                        text: "B".to_string(),
                        is_correct: true,
                    },
                ],
                sample_answer: None,
                max_score: 1,
            },
            CreateQuestion {
                kind: QuestionKind::MultipleChoice,
                text: "Second question".to_string(),
                options: vec![
                    AnswerOption {
                        text: "A".to_string(),
                        is_correct: false,
                    },
                    AnswerOption {
                        text: "C".to_string(),
                        is_correct: true,
                    },
                ],
                sample_answer: None,
                max_score: 1,
            },
        ],
        duration_minutes: 30,
        passing_score: 70,
    }
}

fn answers(pairs: &[(i32, &str)]) -> SubmitTestRequest {
    SubmitTestRequest {
        answers: Some(
            pairs
                .iter()
                .map(|(id, a)| (id.to_string(), a.to_string()))
                .collect::<HashMap<_, _>>(),
        ),
        time_spent_seconds: Some(120),
    }
}

async fn assign_to_user(state: &AppState, test_id: Uuid, user_id: Uuid, assigned_by: Uuid) {
    state
        .assignment_service
        .assign(
            AssignTestRequest {
                test_id,
                assigned_to: Some(vec![user_id]),
                department: None,
                due_date: Utc::now() + Duration::days(7),
            },
            assigned_by,
        )
        .await
        .expect("assign");
}

#[tokio::test]
async fn full_certification_flow() {
    let Some(state) = setup().await else { return };

    let admin = Uuid::new_v4();
    let test = state
        .test_service
        .create_test(two_question_test(), admin)
        .await
        .expect("create test");

    // Failing path.
    let failing_user = Uuid::new_v4();
    assign_to_user(&state, test.id, failing_user, admin).await;

    let content = state
        .attempt_service
        .get_test_for_taking(failing_user, None, test.id)
        .await
        .expect("take");
    assert_eq!(content.total_questions, 2);
    let serialized = serde_json::to_string(&content).unwrap();
    assert!(!serialized.contains("is_correct"));

    let outcome = state
        .attempt_service
        .submit_answers(failing_user, None, test.id, answers(&[(1, "B"), (2, "A")]))
        .await
        .expect("submit");
    assert_eq!(outcome.score, 50);
    assert!(!outcome.passed);

    let err = state
        .certificate_service
        .issue(failing_user, test.id, outcome.result_id)
        .await
        .expect_err("failed result must not mint a certificate");
    assert!(matches!(err, Error::BadRequest(_)));

    // Re-submission after completion is rejected and creates no second result.
    let err = state
        .attempt_service
        .submit_answers(failing_user, None, test.id, answers(&[(1, "B"), (2, "C")]))
        .await
        .expect_err("second submission must be rejected");
    assert!(matches!(err, Error::Forbidden(_)));
    let result_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM test_results WHERE user_id = $1 AND test_id = $2")
            .bind(failing_user)
            .bind(test.id)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert_eq!(result_count, 1);

    // Passing path.
    let passing_user = Uuid::new_v4();
    assign_to_user(&state, test.id, passing_user, admin).await;
    let outcome = state
        .attempt_service
        .submit_answers(passing_user, None, test.id, answers(&[(1, "B"), (2, "C")]))
        .await
        .expect("submit");
    assert_eq!(outcome.score, 100);
    assert!(outcome.passed);

    let certificate = state
        .certificate_service
        .issue(passing_user, test.id, outcome.result_id)
        .await
        .expect("issue certificate");
    assert!(certificate.certificate_number.starts_with("CERT-"));
    assert_eq!(
        (certificate.expiry_date - certificate.issue_date).num_days(),
        180
    );
    assert_eq!(certificate.status, "active");
    assert_eq!(certificate.score, 100);

    // Same result cannot be certified twice.
    let err = state
        .certificate_service
        .issue(passing_user, test.id, outcome.result_id)
        .await
        .expect_err("duplicate issuance must be rejected");
    assert!(matches!(err, Error::Conflict(_)));

    // Another user cannot claim the result.
    let stranger = Uuid::new_v4();
    let err = state
        .certificate_service
        .issue(stranger, test.id, outcome.result_id)
        .await
        .expect_err("foreign result must not be certifiable");
    assert!(matches!(err, Error::NotFound(_)));

    state
        .test_service
        .delete_test(test.id, admin, true)
        .await
        .expect("cleanup");
}

#[tokio::test]
async fn certificate_numbers_stay_unique_under_concurrent_issuance() {
    let Some(state) = setup().await else { return };

    let admin = Uuid::new_v4();
    let test = state
        .test_service
        .create_test(two_question_test(), admin)
        .await
        .expect("create test");

    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    assign_to_user(&state, test.id, user_a, admin).await;
    assign_to_user(&state, test.id, user_b, admin).await;

    let result_a = state
        .attempt_service
        .submit_answers(user_a, None, test.id, answers(&[(1, "B"), (2, "C")]))
        .await
        .expect("submit a");
    let result_b = state
        .attempt_service
        .submit_answers(user_b, None, test.id, answers(&[(1, "B"), (2, "C")]))
        .await
        .expect("submit b");

    let (cert_a, cert_b) = tokio::join!(
        state
            .certificate_service
            .issue(user_a, test.id, result_a.result_id),
        state
            .certificate_service
            .issue(user_b, test.id, result_b.result_id),
    );
    let cert_a = cert_a.expect("issue a");
    let cert_b = cert_b.expect("issue b");
    assert_ne!(cert_a.certificate_number, cert_b.certificate_number);

    state
        .test_service
        .delete_test(test.id, admin, true)
        .await
        .expect("cleanup");
}

#[tokio::test]
async fn issuance_retries_past_an_occupied_number() {
    let Some(state) = setup().await else { return };

    let admin = Uuid::new_v4();
    let test = state
        .test_service
        .create_test(two_question_test(), admin)
        .await
        .expect("create test");

    let user = Uuid::new_v4();
    assign_to_user(&state, test.id, user, admin).await;
    let outcome = state
        .attempt_service
        .submit_answers(user, None, test.id, answers(&[(1, "B"), (2, "C")]))
        .await
        .expect("submit");

    // Occupy the number the counter will hand out next: allocate one, insert
    // a row carrying it, then wind the counter back so the next issuance is
    // dealt the occupied value.
    let year = Utc::now().year();
    let taken: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO certificate_sequences (year, last_value)
        VALUES ($1, 1)
        ON CONFLICT (year)
        DO UPDATE SET last_value = certificate_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(year)
    .fetch_one(&state.pool)
    .await
    .unwrap();
    let occupied = format!("CERT-{}-{:04}", year, taken);
    sqlx::query(
        r#"
        INSERT INTO certificates (user_id, test_id, test_result_id, certificate_number,
                                  score, expiry_date)
        VALUES ($1, $2, $3, $4, 100, NOW() + INTERVAL '180 days')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(test.id)
    .bind(Uuid::new_v4())
    .bind(&occupied)
    .execute(&state.pool)
    .await
    .unwrap();
    sqlx::query("UPDATE certificate_sequences SET last_value = last_value - 1 WHERE year = $1")
        .bind(year)
        .execute(&state.pool)
        .await
        .unwrap();

    let certificate = state
        .certificate_service
        .issue(user, test.id, outcome.result_id)
        .await
        .expect("issuance must survive an occupied number");
    assert_ne!(certificate.certificate_number, occupied);

    state
        .test_service
        .delete_test(test.id, admin, true)
        .await
        .expect("cleanup");
}

#[tokio::test]
async fn late_submission_expires_the_assignment() {
    let Some(state) = setup().await else { return };

    let admin = Uuid::new_v4();
    let test = state
        .test_service
        .create_test(two_question_test(), admin)
        .await
        .expect("create test");

    let user = Uuid::new_v4();
    assign_to_user(&state, test.id, user, admin).await;
    // Backdate the due date; the ledger rejects past dates at assign time.
    sqlx::query("UPDATE test_assignments SET due_date = NOW() - INTERVAL '1 day' WHERE test_id = $1")
        .bind(test.id)
        .execute(&state.pool)
        .await
        .unwrap();

    let err = state
        .attempt_service
        .submit_answers(user, None, test.id, answers(&[(1, "B"), (2, "C")]))
        .await
        .expect_err("late submission must be rejected");
    assert!(matches!(err, Error::Forbidden(_)));

    let status: String =
        sqlx::query_scalar("SELECT status FROM test_assignments WHERE test_id = $1")
            .bind(test.id)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert_eq!(status, "expired");

    state
        .test_service
        .delete_test(test.id, admin, true)
        .await
        .expect("cleanup");
}

#[tokio::test]
async fn dangling_assignments_are_hidden() {
    let Some(state) = setup().await else { return };

    let admin = Uuid::new_v4();
    let test = state
        .test_service
        .create_test(two_question_test(), admin)
        .await
        .expect("create test");

    let user = Uuid::new_v4();
    assign_to_user(&state, test.id, user, admin).await;
    assert_eq!(
        state
            .assignment_service
            .list_for_user(user, None)
            .await
            .expect("list")
            .len(),
        1
    );

    // Delete the test out from under the assignment the way an unrelated
    // admin action would, leaving the row dangling.
    sqlx::query("DELETE FROM test_assignments WHERE test_id = $1")
        .bind(test.id)
        .execute(&state.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO test_assignments (test_id, assigned_by, assigned_to, due_date) VALUES ($1, $2, $3, NOW() + INTERVAL '1 day')")
        .bind(Uuid::new_v4())
        .bind(admin)
        .bind(vec![user])
        .execute(&state.pool)
        .await
        .unwrap();

    let listed = state
        .assignment_service
        .list_for_user(user, None)
        .await
        .expect("list");
    assert!(listed.is_empty());

    state
        .test_service
        .delete_test(test.id, admin, true)
        .await
        .expect("cleanup");
}
