use serde::{Deserialize, Serialize};

/// A single test question, stored as part of the JSONB `questions` array on
/// the owning test row. Ids are assigned sequentially at authoring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_answer: Option<String>,
    #[serde(default = "default_max_score")]
    pub max_score: i32,
}

fn default_max_score() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    Essay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Question view served to test takers: no correctness flags, no sample
/// answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionForTaking {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    pub options: Vec<OptionForTaking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionForTaking {
    pub text: String,
}

impl Question {
    pub fn for_taking(&self) -> QuestionForTaking {
        QuestionForTaking {
            id: self.id,
            kind: self.kind,
            text: self.text.clone(),
            options: self
                .options
                .iter()
                .map(|o| OptionForTaking {
                    text: o.text.clone(),
                })
                .collect(),
        }
    }

    /// Text of the option flagged correct. A multiple-choice question with no
    /// correct option is tolerated here and simply never matches.
    pub fn correct_option_text(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.is_correct)
            .map(|o| o.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc_question() -> Question {
        Question {
            id: 1,
            kind: QuestionKind::MultipleChoice,
            text: "Pick one".to_string(),
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
        }
    }

    #[test]
    fn for_taking_strips_answer_key() {
        let essay = Question {
            id: 2,
            kind: QuestionKind::Essay,
            text: "Explain".to_string(),
            options: vec![],
            sample_answer: Some("reference answer".to_string()),
            max_score: 5,
        };

        let stripped = serde_json::to_value(mc_question().for_taking()).unwrap();
        assert!(stripped.to_string().find("is_correct").is_none());
        assert_eq!(stripped["options"][1]["text"], "B");

        let stripped_essay = serde_json::to_value(essay.for_taking()).unwrap();
        assert!(stripped_essay.to_string().find("sample_answer").is_none());
        assert!(stripped_essay.to_string().find("reference answer").is_none());
    }

    #[test]
    fn correct_option_lookup() {
        assert_eq!(mc_question().correct_option_text(), Some("B"));

        let mut none_correct = mc_question();
        none_correct.options[1].is_correct = false;
        assert_eq!(none_correct.correct_option_text(), None);
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(QuestionKind::MultipleChoice).unwrap(),
            serde_json::json!("multiple_choice")
        );
        assert_eq!(
            serde_json::to_value(QuestionKind::Essay).unwrap(),
            serde_json::json!("essay")
        );
    }
}
