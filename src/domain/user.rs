use crate::domain::password::{self, Password};
use serde::Serialize;
use std::fmt;

/// A persisted credential record. `password_hash` is always a salted hash.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    /// Compares a login candidate with the stored hash. Never fails; anything other than a match is `false`.
    #[must_use]
    pub fn verify_password(&self, candidate: &str) -> bool {
        password::verify(candidate, &self.password_hash)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Fields for a record that does not exist yet. The password is still plaintext here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: Password,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl AsRef<str>, password: impl Into<Password>) -> Self {
        Self {
            username: username.into(),
            email: email.as_ref().to_string(),
            password: password.into(),
        }
        .normalized()
    }

    /// Canonical form that gets validated and stored: surrounding whitespace dropped from the email.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

/// A partial update. `None` leaves the stored column as it is.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<Password>,
}

impl UserChanges {
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl AsRef<str>) -> Self {
        self.email = Some(normalize_email(email.as_ref()));
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Same normalisation as [`NewUser::normalized`] for the fields that are present.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.email = self.email.as_deref().map(normalize_email);
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }

    /// The new plaintext, if this update really changes the password.
    ///
    /// Callers that round-trip a loaded record hand back its stored hash;
    /// that value is not a new password and must not be hashed again.
    #[must_use]
    pub fn password_change(&self, current_hash: &str) -> Option<&Password> {
        self.password.as_ref().filter(|p| p.expose() != current_hash)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::Params;

    fn stored_user(plain: &str) -> User {
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
        User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: password::hash(plain, params).unwrap(),
        }
    }

    #[test]
    fn test_verify_password_is_stable_and_read_only() {
        let user = stored_user("abcd");
        let before = user.password_hash.clone();

        for _ in 0..3 {
            assert!(user.verify_password("abcd"));
            assert!(!user.verify_password("wrong"));
        }
        assert_eq!(user.password_hash, before);
    }

    #[test]
    fn test_serialized_user_omits_hash() {
        let user = stored_user("abcd");
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["email"], "alice@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_debug_omits_hash() {
        let user = stored_user("abcd");
        let rendered = format!("{user:?}");
        assert!(!rendered.contains(&user.password_hash));
    }

    #[test]
    fn test_new_user_trims_email() {
        let user = NewUser::new("alice", "  alice@example.com\n", "abcd");
        assert_eq!(user.email, "alice@example.com");
    }

    #[test]
    fn test_literal_fields_are_normalized() {
        let user = NewUser { username: "alice".into(), email: "\talice@example.com ".into(), password: "abcd".into() };
        assert_eq!(user.normalized().email, "alice@example.com");

        let changes = UserChanges { email: Some(" bob@example.com\n".into()), ..UserChanges::default() };
        assert_eq!(changes.normalized().email.as_deref(), Some("bob@example.com"));

        assert!(UserChanges::default().normalized().email.is_none());
    }

    #[test]
    fn test_password_change_ignores_round_tripped_hash() {
        let user = stored_user("abcd");

        let unchanged = UserChanges::default().with_username("bob").with_password(user.password_hash.as_str());
        assert!(unchanged.password_change(&user.password_hash).is_none());

        let changed = UserChanges::default().with_password("efgh");
        assert_eq!(changed.password_change(&user.password_hash).map(Password::expose), Some("efgh"));

        assert!(UserChanges::default().password_change(&user.password_hash).is_none());
    }
}
