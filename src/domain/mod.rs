pub mod password;
pub mod user;
pub mod validation;
