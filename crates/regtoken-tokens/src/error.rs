//! Error types for the token crate.

use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No token with that name exists.
    #[error("token not found: {0}")]
    NotFound(String),

    /// The token exists but is disabled, expired or used up.
    #[error("token is not active: {0}")]
    NotActive(String),

    /// The name generator kept producing names already in use.
    #[error("no unused token name after {0} attempts")]
    NameUnavailable(usize),

    /// The durable write did not succeed. Nothing was changed.
    #[error("failed to persist token: {0}")]
    Persistence(#[from] StoreError),
}

/// Errors that can occur in a token store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored record violates a token invariant.
    #[error("corrupt token record: {0}")]
    Corrupt(String),

    #[error("Lock error")]
    LockError,

    /// Failure reported by a store implementation outside this crate.
    #[error("storage error: {0}")]
    Backend(String),
}

/// An expiration expression that is neither a keyword nor a date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpirationError {
    #[error(
        "expires '{0}' is not valid. Expected 'never', 'day', 'week', 'month' or ISO-8601 date (YYYY-MM-DD)"
    )]
    Invalid(String),
}
