//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] reservio_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists for the class.
    #[error("account already exists")]
    AccountAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A signup field required for this account class was not sent.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Access or refresh token is unknown or expired.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Authenticated, but not allowed (wrong class, suspended business).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Admin signup is disabled because no signup code is configured.
    #[error("admin signup is disabled")]
    SignupDisabled,

    /// The admin signup code did not match.
    #[error("invalid signup code")]
    InvalidSignupCode,

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
