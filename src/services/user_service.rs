use crate::domain::user::{NewUser, User, UserChanges};
use crate::domain::validation;
use crate::error::{AppError, Result};
use crate::services::password_service::PasswordService;
use crate::storage::DbPool;
use crate::storage::user_repo::UserRepository;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::fmt;

#[derive(Clone)]
struct UserMetrics {
    users_created_total: Counter<u64>,
    users_updated_total: Counter<u64>,
    password_verifications_total: Counter<u64>,
}

impl UserMetrics {
    fn new() -> Self {
        let meter = global::meter("credstore");
        Self {
            users_created_total: meter
                .u64_counter("users_created_total")
                .with_description("Total number of user records created")
                .build(),
            users_updated_total: meter
                .u64_counter("users_updated_total")
                .with_description("Total number of user records updated")
                .build(),
            password_verifications_total: meter
                .u64_counter("password_verifications_total")
                .with_description("Total number of password checks, by outcome")
                .build(),
        }
    }
}

/// Write path for credential records: validate, hash, then persist.
#[derive(Clone)]
pub struct UserService {
    pool: DbPool,
    repo: UserRepository,
    passwords: PasswordService,
    metrics: UserMetrics,
}

impl fmt::Debug for UserService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserService")
            .field("repo", &self.repo)
            .field("passwords", &self.passwords)
            .finish_non_exhaustive()
    }
}

impl UserService {
    #[must_use]
    pub fn new(pool: DbPool, repo: UserRepository, passwords: PasswordService) -> Self {
        Self { pool, repo, passwords, metrics: UserMetrics::new() }
    }

    /// Validates `new_user`, replaces its password with a salted hash and stores it.
    ///
    /// # Errors
    /// `AppError::Validation` for bad fields, `AppError::Uniqueness` for a taken email,
    /// `AppError::Hashing` if hashing fails (nothing is written in that case).
    #[tracing::instrument(
        skip(self, new_user),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let new_user = new_user.normalized();
        validation::validate_new(&new_user)?;

        let password_hash = self.passwords.hash_password(&new_user.password).await?;

        let user = self.repo.create(&self.pool, &new_user.username, &new_user.email, &password_hash).await?;

        tracing::Span::current().record("user_id", user.id);
        tracing::info!("User created");
        self.metrics.users_created_total.add(1, &[]);

        Ok(user)
    }

    /// Applies `changes` to the record `id`. The password is hashed only if it actually changed.
    ///
    /// # Errors
    /// `AppError::Validation`, `AppError::NotFound`, `AppError::Uniqueness` or `AppError::Hashing`.
    #[tracing::instrument(skip(self, changes), fields(user_id = id), err(level = "warn"))]
    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<User> {
        let changes = changes.normalized();
        validation::validate_changes(&changes)?;

        if changes.is_empty() {
            return self.find_by_id(id).await?.ok_or(AppError::NotFound);
        }

        let mut tx = self.pool.begin().await?;

        let mut user = self.repo.find_by_id_for_update(&mut tx, id).await?.ok_or(AppError::NotFound)?;

        let rehash = changes.password_change(&user.password_hash).cloned();
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password) = rehash {
            user.password_hash = self.passwords.hash_password(&password).await?;
            tracing::debug!("Password changed");
        }

        let user = self.repo.update(&mut *tx, &user).await?;

        tx.commit().await?;

        tracing::info!("User updated");
        self.metrics.users_updated_total.add(1, &[]);

        Ok(user)
    }

    /// True iff `candidate` matches the stored hash. Never fails and never touches the record.
    #[tracing::instrument(skip(self, user, candidate), fields(user_id = user.id))]
    pub async fn verify_password(&self, user: &User, candidate: &str) -> bool {
        let is_valid = self.passwords.verify_password(candidate, &user.password_hash).await;

        let outcome = if is_valid { "match" } else { "mismatch" };
        self.metrics.password_verifications_total.add(1, &[KeyValue::new("result", outcome)]);

        is_valid
    }

    /// Looks up `email` and checks `candidate` against it.
    /// An unknown email and a wrong password both come back as `None`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the lookup fails.
    #[tracing::instrument(skip(self, email, candidate), fields(user_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn authenticate(&self, email: &str, candidate: &str) -> Result<Option<User>> {
        let Some(user) = self.repo.find_by_email(&self.pool, email.trim()).await? else {
            tracing::warn!("Authentication failed: user not found");
            return Ok(None);
        };

        tracing::Span::current().record("user_id", user.id);

        if !self.verify_password(&user, candidate).await {
            tracing::warn!("Authentication failed: invalid password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// # Errors
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>> {
        self.repo.find_by_id(&self.pool, id).await
    }

    /// # Errors
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repo.find_by_email(&self.pool, email.trim()).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if there is no such record.
    #[tracing::instrument(skip(self), fields(user_id = id), err(level = "warn"))]
    pub async fn delete(&self, id: i32) -> Result<()> {
        if !self.repo.delete(&self.pool, id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!("User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashingConfig;
    use crate::domain::validation::Violation;

    // Validation runs before any connection is acquired, so a lazy pool is never used.
    fn setup_service() -> UserService {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap();
        let passwords =
            PasswordService::new(&HashingConfig { cost: 1, memory_kib: argon2::Params::MIN_M_COST, parallelism: 1 })
                .unwrap();
        UserService::new(pool, UserRepository::new(), passwords)
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields_before_storage() {
        let service = setup_service();
        let err = service.create(NewUser::new("alice", "not-an-email", "abc")).await.unwrap_err();

        let errors = match err {
            AppError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert!(errors.has("email", Violation::InvalidEmail));
        assert!(errors.has("password", Violation::TooShort { min: 4 }));
    }

    #[tokio::test]
    async fn test_create_normalizes_email_built_from_fields() {
        let service = setup_service();
        let new_user = NewUser { username: "alice".into(), email: "  alice@example.com \n".into(), password: "abc".into() };
        let err = service.create(new_user).await.unwrap_err();

        // Only the password is at fault; the padded email passes once trimmed.
        let errors = match err {
            AppError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert!(!errors.has("email", Violation::InvalidEmail));
        assert_eq!(errors.violations().len(), 1);
    }

    #[tokio::test]
    async fn test_update_normalizes_email_built_from_fields() {
        let service = setup_service();
        let changes = UserChanges {
            email: Some(" bob@example.com ".into()),
            password: Some("abc".into()),
            ..UserChanges::default()
        };
        let err = service.update(1, changes).await.unwrap_err();

        let errors = match err {
            AppError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert!(!errors.has("email", Violation::InvalidEmail));
        assert!(errors.has("password", Violation::TooShort { min: 4 }));
    }

    #[tokio::test]
    async fn test_update_rejects_short_password_before_storage() {
        let service = setup_service();
        let err = service.update(1, UserChanges::default().with_password("abc")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_verify_password_without_storage() {
        let service = setup_service();
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: service.passwords.hash_password(&"abcd".into()).await.unwrap(),
        };

        assert!(service.verify_password(&user, "abcd").await);
        assert!(!service.verify_password(&user, "abce").await);
    }
}
