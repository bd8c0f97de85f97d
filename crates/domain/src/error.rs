//! Domain error types.

use thiserror::Error;

/// Errors raised while validating domain input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Username is shorter than the minimum length.
    #[error("Username must be at least 3 characters")]
    UsernameTooShort,

    /// Email address does not look like an address.
    #[error("Email address is not valid")]
    InvalidEmail,

    /// Password is shorter than the minimum length.
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,

    /// A display name was empty or whitespace only.
    #[error("Name must not be empty")]
    EmptyName,

    /// A catalog price was negative.
    #[error("Price must not be negative")]
    NegativePrice,

    /// A cart quantity was zero.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}
