pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    assignment_service::AssignmentService, attempt_service::AttemptService,
    certificate_service::CertificateService, test_service::TestService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub test_service: TestService,
    pub assignment_service: AssignmentService,
    pub attempt_service: AttemptService,
    pub certificate_service: CertificateService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let test_service = TestService::new(pool.clone());
        let assignment_service = AssignmentService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let certificate_service = CertificateService::new(pool.clone());

        Self {
            pool,
            test_service,
            assignment_service,
            attempt_service,
            certificate_service,
        }
    }
}
