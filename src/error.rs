//! Error types for the conversion pipeline

use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a rendered slide
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the rendering surface
    #[error("Surface initialization failed: {0}")]
    Initialization(String),

    /// Failed to load a document into the surface
    #[error("Failed to load document: {0}")]
    Load(String),

    /// A surface round-trip (measure, eval, mutation) failed
    #[error("Surface operation failed: {0}")]
    Surface(String),

    /// A region or node capture failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The DOM snapshot returned by the surface could not be decoded
    #[error("Malformed DOM snapshot: {0}")]
    Snapshot(String),

    /// A surface operation exceeded the fixed timeout
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// One or more validation findings; the message numbers them when
    /// more than one applies
    #[error("Slide validation failed: {0}")]
    Validation(String),

    /// The slide-building API rejected an element
    #[error("Deck assembly failed: {0}")]
    Assembly(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Cdp(err.to_string())
    }
}
