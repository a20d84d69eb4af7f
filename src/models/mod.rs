pub mod assignment;
pub mod certificate;
pub mod question;
pub mod test_result;
