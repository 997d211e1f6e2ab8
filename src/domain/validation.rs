//! Field rules for the `user` table, checked before anything is hashed or written.

use crate::domain::user::{NewUser, UserChanges};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub const MIN_PASSWORD_LEN: usize = 4;

/// Width of the `VARCHAR` columns backing `username` and `email`.
pub const MAX_COLUMN_LEN: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Required,
    InvalidEmail,
    TooShort { min: usize },
    TooLong { max: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "is required"),
            Self::InvalidEmail => write!(f, "must be a valid email address"),
            Self::TooShort { min } => write!(f, "must be at least {min} characters"),
            Self::TooLong { max } => write!(f, "must be at most {max} characters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub violation: Violation,
}

/// Every rule a payload broke, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, violation: Violation) {
        self.violations.push(FieldViolation { field, violation });
    }

    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    #[must_use]
    pub fn has(&self, field: &str, violation: Violation) -> bool {
        self.violations.iter().any(|v| v.field == field && v.violation == violation)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", v.field, v.violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_COLUMN_LEN && EMAIL_RE.is_match(email)
}

fn check_username(errors: &mut ValidationErrors, username: &str) {
    if username.trim().is_empty() {
        errors.push("username", Violation::Required);
    } else if username.chars().count() > MAX_COLUMN_LEN {
        errors.push("username", Violation::TooLong { max: MAX_COLUMN_LEN });
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.push("email", Violation::Required);
    } else if !is_valid_email(email) {
        errors.push("email", Violation::InvalidEmail);
    }
}

// Length counts characters, not bytes.
fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.is_empty() {
        errors.push("password", Violation::Required);
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("password", Violation::TooShort { min: MIN_PASSWORD_LEN });
    }
}

/// Checks a record about to be inserted. All fields are mandatory.
///
/// # Errors
/// Returns every violated rule at once.
pub fn validate_new(user: &NewUser) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_username(&mut errors, &user.username);
    check_email(&mut errors, &user.email);
    check_password(&mut errors, user.password.expose());
    errors.into_result()
}

/// Checks a partial update. Absent fields are left alone; present ones obey the insert rules.
///
/// # Errors
/// Returns every violated rule at once.
pub fn validate_changes(changes: &UserChanges) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(username) = &changes.username {
        check_username(&mut errors, username);
    }
    if let Some(email) = &changes.email {
        check_email(&mut errors, email);
    }
    if let Some(password) = &changes.password {
        check_password(&mut errors, password.expose());
    }
    errors.into_result()
}
