//! User accounts and registration input.

use chrono::{DateTime, Utc};
use common::UserId;

use crate::error::DomainError;

/// Minimum username length accepted at registration.
pub const MIN_USERNAME_LEN: usize = 3;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A registered user account.
///
/// Only the password hash is ever stored; the clear-text password stays
/// at the api boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user record with a fresh id.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// Validated registration input.
///
/// Carries the clear-text password only until it is hashed; stores never
/// see it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Validates registration input.
    ///
    /// Username and email are trimmed before validation; the password is
    /// taken as-is.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let username = username.into().trim().to_string();
        let email = email.into().trim().to_string();
        let password = password.into();

        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(DomainError::UsernameTooShort);
        }
        if !is_valid_email(&email) {
            return Err(DomainError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::PasswordTooShort);
        }

        Ok(Self {
            username,
            email,
            password,
        })
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, host)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
}
