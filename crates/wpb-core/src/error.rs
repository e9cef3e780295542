//! Error types for wpb

use thiserror::Error;

/// wpb error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unrecognized working point, incompatible combination or other invalid setup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Array length or per-event cardinality disagrees with its collection.
    #[error("shape error: {0}")]
    Shape(String),

    /// A selection mask with this name is already registered.
    #[error("duplicate selection: '{0}'")]
    DuplicateSelection(String),

    /// A weight factor with this name is already registered.
    #[error("duplicate weight: '{0}'")]
    DuplicateWeight(String),

    /// A selection mask with this name was never registered.
    #[error("unknown selection: '{0}'")]
    UnknownSelection(String),

    /// A weight factor with this name was never registered.
    #[error("unknown weight: '{0}'")]
    UnknownWeight(String),

    /// A weight factor was registered without up/down variations.
    #[error("weight '{0}' has no up/down variations")]
    MissingVariation(String),

    /// External scale-factor lookup failed.
    #[error("lookup error: {0}")]
    Lookup(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::Shape`] unless `got == expected`.
pub fn ensure_len(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::Shape(format!("{what}: expected length {expected}, got {got}")));
    }
    Ok(())
}
