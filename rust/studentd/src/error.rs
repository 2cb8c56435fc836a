//! Error types for the student records store.

use thiserror::Error;

/// Errors raised by the store, CSV exchange and settings layers.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A field failed validation. The message is suitable for showing to a user.
    #[error("{message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable description.
        message: String,
    },

    /// Another record already uses this email address.
    #[error("a student with email {email} already exists")]
    DuplicateEmail {
        /// The normalized email that collided.
        email: String,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    Database(#[from] rusqlite::Error),

    /// Reading or writing CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable error code used on the sidecar wire.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "bad_params",
            Self::DuplicateEmail { .. } => "duplicate_email",
            Self::Database(_) => "db_query_failed",
            Self::Csv(_) => "csv_failed",
            Self::Io(_) | Self::Json(_) => "io_failed",
        }
    }

    /// Map a unique-constraint failure on `students.email` to `DuplicateEmail`.
    pub(crate) fn from_insert(err: rusqlite::Error, email: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(ref f, ref msg) = err {
            let is_unique = f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE;
            let on_email = msg.as_deref().map(|m| m.contains("email")).unwrap_or(true);
            if is_unique && on_email {
                return Self::DuplicateEmail {
                    email: email.to_string(),
                };
            }
        }
        Self::Database(err)
    }
}
