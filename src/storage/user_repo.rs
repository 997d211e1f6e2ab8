use crate::domain::user::User;
use crate::error::{AppError, Result};
use crate::storage::records::UserRecord;
use sqlx::{Executor, PgConnection, Postgres};

#[derive(Clone, Debug, Default)]
pub struct UserRepository {}

impl UserRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Inserts a record. `password_hash` must already be hashed.
    ///
    /// # Errors
    /// Returns `AppError::Uniqueness` if the email is taken, or `AppError::Database` on any other failure.
    pub async fn create<'e, E>(&self, executor: E, username: &str, email: &str, password_hash: &str) -> Result<User>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO "user" (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::Database(e).on_unique_violation("email"))?;

        Ok(record.into())
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<User>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, username, email, password FROM "user" WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record.map(Into::into))
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    pub async fn find_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<User>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, username, email, password FROM "user" WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Loads a record and row-locks it until the surrounding transaction ends.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    pub async fn find_by_id_for_update(&self, conn: &mut PgConnection, id: i32) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, username, email, password FROM "user" WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Overwrites every mutable column of `user`. The id never changes.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the row is gone, `AppError::Uniqueness` if the new
    /// email is taken, or `AppError::Database` on any other failure.
    pub async fn update<'e, E>(&self, executor: E, user: &User) -> Result<User>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE "user"
            SET username = $2, email = $3, password = $4
            WHERE id = $1
            RETURNING id, username, email, password
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::Database(e).on_unique_violation("email"))?
        .ok_or(AppError::NotFound)?;

        Ok(record.into())
    }

    /// Returns whether a row was removed.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the statement fails.
    pub async fn delete<'e, E>(&self, executor: E, id: i32) -> Result<bool>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
