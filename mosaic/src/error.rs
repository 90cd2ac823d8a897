//! Error types for the mosaic library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while cataloguing, querying or loading tiles.
#[derive(Error, Debug)]
pub enum MosaicError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON catalog index could not be read or written.
    #[error("Index error: {0}")]
    Index(#[from] serde_json::Error),

    /// A zipped tile archive could not be read.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A required argument to a constructor or builder was missing or invalid.
    #[error("Invalid argument: {field}")]
    Validation { field: &'static str },

    /// A caller passed an absent value where one is required.
    #[error("Precondition violated: {0}")]
    Precondition(&'static str),

    /// The operation is structurally disallowed on this object.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// No registered reader accepts the given URI.
    #[error("No tile reader supports {uri}")]
    UnsupportedFormat { uri: String },

    /// A cursor was used after it was closed.
    #[error("Cursor is closed")]
    CursorClosed,

    /// A catalog was queried before being opened, or after being closed.
    #[error("Mosaic database is not open")]
    DatabaseClosed,

    /// Internal bookkeeping reached a state that must never occur.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// File size doesn't match SRTM1 or SRTM3 format.
    #[error("Invalid file size: {size} bytes (expected 25934402 for SRTM1 or 2884802 for SRTM3)")]
    InvalidFileSize { size: usize },

    /// A tile file name does not follow the expected naming convention.
    #[error("Invalid tile name: {name}")]
    InvalidTileName { name: String },

    /// Tile payload is unreadable.
    #[error("Corrupt tile {uri}: {reason}")]
    CorruptTile { uri: String, reason: String },

    /// A frame's bounds are not a usable rectangle (NaN or inverted).
    #[error("Malformed bounds for frame {path}")]
    MalformedBounds { path: String },

    /// The catalog index file was not found.
    #[error("Index file not found: {path}")]
    IndexNotFound { path: PathBuf },
}

impl MosaicError {
    /// Whether retrying the same operation is pointless.
    ///
    /// Reported through [`crate::callback::RequestCallback::on_request_error`]
    /// as the `fatal` flag.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MosaicError::Io(_) | MosaicError::Archive(_) | MosaicError::IndexNotFound { .. }
        )
    }
}

/// Result type alias using [`MosaicError`].
pub type Result<T> = std::result::Result<T, MosaicError>;
