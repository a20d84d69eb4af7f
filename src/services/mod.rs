pub mod assignment_service;
pub mod attempt_service;
pub mod certificate_service;
pub mod grading_service;
pub mod test_service;
