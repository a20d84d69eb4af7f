use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTestRequest {
    pub test_id: Uuid,
    pub assigned_to: Option<Vec<Uuid>>,
    pub department: Option<String>,
    pub due_date: DateTime<Utc>,
}

impl AssignTestRequest {
    pub fn has_user_target(&self) -> bool {
        self.assigned_to
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    pub fn has_department_target(&self) -> bool {
        self.department
            .as_deref()
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false)
    }

    /// A well-formed target names users or a department, never both and
    /// never neither.
    pub fn has_valid_target(&self) -> bool {
        self.has_user_target() != self.has_department_target()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedTestSummary {
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub passing_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentListItem {
    pub id: Uuid,
    pub test_id: Uuid,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub assigned_by: Uuid,
    pub test: AssignedTestSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_request() -> AssignTestRequest {
        AssignTestRequest {
            test_id: Uuid::new_v4(),
            assigned_to: None,
            department: None,
            due_date: Utc::now() + Duration::days(7),
        }
    }

    #[test]
    fn rejects_empty_target() {
        assert!(!base_request().has_valid_target());

        let mut empty_list = base_request();
        empty_list.assigned_to = Some(vec![]);
        assert!(!empty_list.has_valid_target());

        let mut blank_department = base_request();
        blank_department.department = Some("   ".to_string());
        assert!(!blank_department.has_valid_target());
    }

    #[test]
    fn rejects_ambiguous_target() {
        let mut both = base_request();
        both.assigned_to = Some(vec![Uuid::new_v4()]);
        both.department = Some("engineering".to_string());
        assert!(!both.has_valid_target());
    }

    #[test]
    fn accepts_exactly_one_target() {
        let mut users = base_request();
        users.assigned_to = Some(vec![Uuid::new_v4()]);
        assert!(users.has_valid_target());

        let mut department = base_request();
        department.department = Some("engineering".to_string());
        assert!(department.has_valid_target());
    }
}
