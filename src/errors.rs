//! Unified error type for `EventEase`.
//!
//! Every failure is returned as an [`Error`]. Callers that need to decide how to
//! present a failure use [`Error::kind`] to classify it and [`Error::user_message`]
//! for the text shown to the person who triggered the operation.

use thiserror::Error;

/// Coarse classification used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input was rejected before any store call was made.
    Validation,
    /// The store, the auth service or the session refused or failed the call.
    Remote,
    /// The requested document does not exist. Terminal for the caller's view.
    NotFound,
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A form field failed its validation rule.
    #[error("{message}")]
    Validation {
        /// Name of the offending field as it appears in the form.
        field: &'static str,
        /// Message suitable for display.
        message: String,
    },

    /// A document looked up by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was missing (e.g. `"Event"`).
        entity: &'static str,
        /// Document id that was requested.
        id: String,
    },

    /// The operation needs a signed-in user and the session has none.
    #[error("You must be logged in to continue")]
    Unauthenticated,

    /// The signed-in user may not touch this document.
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// What was refused.
        message: String,
    },

    /// RSVP state change that the state machine does not allow.
    #[error("Cannot change RSVP from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Failure reported by the auth provider (bad credentials, duplicate account...).
    #[error("Authentication error: {message}")]
    Auth {
        /// Provider message.
        message: String,
    },

    /// Generic failure of a remote collaborator.
    #[error("Remote operation failed: {message}")]
    Remote {
        /// Collaborator message.
        message: String,
    },

    /// Error raised by the SQL backend.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A document body could not be converted to or from a record.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong.
        message: String,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a [`Error::Validation`] for `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Builds a [`Error::NotFound`] for a record of kind `entity`.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidTransition { .. } | Self::Config { .. } => {
                ErrorKind::Validation
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthenticated
            | Self::PermissionDenied { .. }
            | Self::Auth { .. }
            | Self::Remote { .. }
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Remote,
        }
    }

    /// Text to show the user. Backend details are kept out of remote failures.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound { entity, .. } => format!("{entity} not found."),
            Self::Database(_) | Self::Serialization(_) | Self::Io(_) | Self::Remote { .. } => {
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
