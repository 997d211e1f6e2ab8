use crate::domain::user::User;

/// Row of the `"user"` table. The `password` column only ever holds a hash.
#[derive(sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            password_hash: record.password,
        }
    }
}
