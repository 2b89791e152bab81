//! Error types for ticketbooth.
//!
//! This module defines all error types used throughout the ticketbooth crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::form::FormField;

/// The main error type for ticketbooth operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Persistence Errors ===
    /// The ticket list could not be written back to its storage slot.
    ///
    /// The in-memory mutation that triggered the write is kept.
    #[error("failed to save tickets to slot '{slot}': {source}")]
    PersistenceWrite {
        /// Storage slot that was being written.
        slot: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// The persisted ticket list could not be read or decoded.
    #[error("failed to load tickets from slot '{slot}': {source}")]
    PersistenceRead {
        /// Storage slot that was being read.
        slot: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    // === Store Errors ===
    /// A position passed to the store does not exist.
    #[error("ticket index {index} is out of range (store holds {len})")]
    IndexOutOfRange {
        /// The offending position.
        index: usize,
        /// Number of tickets held when the call was made.
        len: usize,
    },

    /// The form was submitted with one or more empty fields.
    #[error("form is incomplete, missing: {}", format_fields(.missing))]
    IncompleteForm {
        /// Fields that were empty.
        missing: Vec<FormField>,
    },

    // === QR Errors ===
    /// The payload could not be encoded as a QR symbol.
    #[error("QR encoding failed: {0}")]
    QrEncode(String),

    /// No readable QR symbol was found in an image.
    #[error("QR decoding failed: {0}")]
    QrDecode(String),

    /// Raster image encoding or decoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for ticketbooth operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

fn format_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Wrap an error raised while saving the ticket list.
    #[must_use]
    pub fn persistence_write(slot: impl Into<String>, source: Error) -> Self {
        Self::PersistenceWrite {
            slot: slot.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error raised while loading the ticket list.
    #[must_use]
    pub fn persistence_read(slot: impl Into<String>, source: Error) -> Self {
        Self::PersistenceRead {
            slot: slot.into(),
            source: Box::new(source),
        }
    }

    /// Create a new QR encoding error.
    #[must_use]
    pub fn qr_encode(message: impl Into<String>) -> Self {
        Self::QrEncode(message.into())
    }

    /// Create a new QR decoding error.
    #[must_use]
    pub fn qr_decode(message: impl Into<String>) -> Self {
        Self::QrDecode(message.into())
    }

    /// Check if this error came from writing or reading the ticket slot.
    #[must_use]
    pub fn is_persistence_error(&self) -> bool {
        matches!(
            self,
            Self::PersistenceWrite { .. } | Self::PersistenceRead { .. }
        )
    }

    /// Check if this error is an out-of-range index.
    #[must_use]
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. })
    }
}
