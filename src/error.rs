//! Error types for fcover.
//!
//! Indexing failures (`Parse`, `Io`) abort construction of an archive.
//! Extraction failures (`DateNotFound`, `UnknownZone`, `DataAccess`) are
//! scoped to a single call and leave the index untouched.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fcover operations.
#[derive(Error, Debug)]
pub enum FcoverError {
    /// A raster filename does not carry the expected revision/timestamp tokens
    #[error("Cannot parse raster filename {filename}: {message}")]
    Parse { filename: String, message: String },

    /// No indexed file formats to the requested display date
    #[error("No raster file for date {date}")]
    DateNotFound { date: String },

    /// The zone resolver does not know the requested zone
    #[error("Unknown zone: {name}")]
    UnknownZone { name: String },

    /// Raster file missing, unreadable or lacking the expected variables
    #[error("Cannot read {}: {message}", path.display())]
    DataAccess { path: PathBuf, message: String },

    /// Zone catalog could not be interpreted
    #[error("Zone catalog {}: {message}", path.display())]
    ZoneCatalog { path: PathBuf, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Image generation errors
    #[error("Image generation error: {message}")]
    ImageGeneration { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FcoverError {
    /// Whether the error belongs to a single extraction request.
    ///
    /// Presenters show these as a message and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FcoverError::DateNotFound { .. }
                | FcoverError::UnknownZone { .. }
                | FcoverError::DataAccess { .. }
        )
    }
}

/// Convenience type alias for Results with FcoverError
pub type Result<T> = std::result::Result<T, FcoverError>;
