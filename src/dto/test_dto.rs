use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{AnswerOption, QuestionForTaking, QuestionKind};
use crate::models::test::Test;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTestRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub skill_level: Option<String>,
    #[validate(length(min = 1, message = "A test must contain at least one question"))]
    pub questions: Vec<CreateQuestion>,
    #[validate(range(min = 1, message = "Duration must be a positive number of minutes"))]
    pub duration_minutes: i32,
    #[validate(range(min = 0, max = 100, message = "Passing score must be between 0 and 100"))]
    pub passing_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestion {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    pub sample_answer: Option<String>,
    #[serde(default = "default_max_score")]
    pub max_score: i32,
}

fn default_max_score() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTestRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub skill_level: Option<String>,
    pub questions: Option<Vec<CreateQuestion>>,
    #[validate(range(min = 1, message = "Duration must be a positive number of minutes"))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0, max = 100, message = "Passing score must be between 0 and 100"))]
    pub passing_score: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedTests {
    #[serde(rename = "items")]
    pub tests: Vec<Test>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Test content served to a taker: answer key stripped, sample answers
/// omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeTestResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub total_questions: usize,
    pub questions: Vec<QuestionForTaking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTestRequest {
    pub answers: Option<HashMap<String, String>>,
    pub time_spent_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTestResponse {
    pub score: i32,
    pub passed: bool,
    pub result_id: Uuid,
}
