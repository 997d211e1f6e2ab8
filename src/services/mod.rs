pub mod password_service;
pub mod user_service;
