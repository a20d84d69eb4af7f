use std::collections::HashMap;

use crate::models::question::{Question, QuestionKind};

pub struct GradingService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeOutcome {
    pub correct_count: u32,
    pub total_questions: u32,
    pub score: i32,
}

impl GradingService {
    /// Scores a submission against the answer key. Only multiple-choice
    /// questions are auto-scored: the submitted answer must match the text of
    /// the option flagged correct, exactly and case-sensitively. Essay
    /// questions earn nothing automatically but stay in the denominator, so
    /// a mixed test caps below 100% until manual review.
    pub fn score_submission(
        questions: &[Question],
        answers: &HashMap<String, String>,
    ) -> GradeOutcome {
        let total_questions = questions.len() as u32;
        let mut correct_count = 0u32;

        for question in questions {
            if question.kind != QuestionKind::MultipleChoice {
                continue;
            }
            let submitted = answers.get(&question.id.to_string());
            if let (Some(answer), Some(correct)) = (submitted, question.correct_option_text()) {
                if answer == correct {
                    correct_count += 1;
                }
            }
        }

        let score = if total_questions == 0 {
            0
        } else {
            round_half_up(100 * correct_count, total_questions)
        };

        GradeOutcome {
            correct_count,
            total_questions,
            score,
        }
    }
}

/// Integer round-half-up of numerator/denominator.
fn round_half_up(numerator: u32, denominator: u32) -> i32 {
    ((2 * numerator + denominator) / (2 * denominator)) as i32
}
