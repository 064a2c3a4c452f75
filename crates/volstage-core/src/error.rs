//! Error types for volstage-rs.

use thiserror::Error;

/// The main error type for volstage-rs operations.
#[derive(Error, Debug)]
pub enum VolstageError {
    /// A data array was created with zero components.
    #[error("array '{0}' must have at least one component")]
    NoComponents(String),

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A field has no samples left after the point/cell adjustment.
    #[error("degenerate field dimensions {0}x{1}x{2}")]
    DegenerateDimensions(u32, u32, u32),

    /// An option value is outside its valid range.
    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for volstage-rs operations.
pub type Result<T> = std::result::Result<T, VolstageError>;
