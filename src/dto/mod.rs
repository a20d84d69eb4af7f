pub mod assignment_dto;
pub mod certificate_dto;
pub mod test_dto;
