use crate::domain::validation::ValidationErrors;
use thiserror::Error;

/// SQLSTATE raised by PostgreSQL on a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Value already exists: {field}")]
    Uniqueness { field: &'static str },
    #[error("Not found")]
    NotFound,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Internal error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Rewrites a unique-constraint violation from the database into `Uniqueness`.
    /// Any other error passes through untouched.
    #[must_use]
    pub fn on_unique_violation(self, field: &'static str) -> Self {
        if let Self::Database(sqlx::Error::Database(db_err)) = &self
            && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        {
            return Self::Uniqueness { field };
        }
        self
    }

    /// Whether this error reflects bad caller input rather than a system failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Uniqueness { .. } | Self::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_pass_through_unique_mapping() {
        let err = AppError::NotFound.on_unique_violation("email");
        assert!(matches!(err, AppError::NotFound));

        let err = AppError::Database(sqlx::Error::RowNotFound).on_unique_violation("email");
        assert!(matches!(err, AppError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AppError::Uniqueness { field: "email" }.is_client_error());
        assert!(AppError::NotFound.is_client_error());
        assert!(!AppError::Internal.is_client_error());
        assert!(!AppError::Hashing("boom".into()).is_client_error());
    }

    #[test]
    fn test_uniqueness_message_names_field() {
        let err = AppError::Uniqueness { field: "email" };
        assert_eq!(err.to_string(), "Value already exists: email");
    }
}
