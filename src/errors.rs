//! Unified error type for `EcoTrack`.
//!
//! Every failure in the crate is expressed as an [`Error`] variant. The
//! variants fall into four families: validation (bad input), not-found
//! (missing or foreign records), permission (membership or participation
//! required) and infrastructure (database, configuration, I/O). The web layer
//! maps each family onto an HTTP status in `web::error`.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Every failure the application can report
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: f64 },

    #[error("User not found: {id}")]
    UserNotFound { id: i64 },

    #[error("Activity not found: {id}")]
    ActivityNotFound { id: i64 },

    #[error("Community not found: {id}")]
    CommunityNotFound { id: i64 },

    #[error("Challenge not found: {id}")]
    ChallengeNotFound { id: i64 },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Already exists: {message}")]
    Conflict { message: String },

    #[error("Map asset error: {message}")]
    MapAsset { message: String },
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Maps a unique-constraint violation to [`Error::Conflict`], anything
    /// else to [`Error::Database`].
    pub fn conflict_or_db(err: DbErr, message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict {
                message: message.into(),
            },
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
