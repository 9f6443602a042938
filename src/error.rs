//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing a node
#[derive(Error, Debug)]
pub enum Error {
    /// The capture was handed something it cannot render (e.g. a text node as root)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A resource could not be fetched and no placeholder was configured
    #[error("Cannot fetch resource: {url}, {reason}")]
    ResourceFetch { url: String, reason: String },

    /// A fetch exceeded its time limit
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// An image payload could not be decoded
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    /// A style sheet could not be read
    #[error("Error while reading CSS rules: {0}")]
    StyleSheet(String),

    /// Failed to encode a surface
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Failed to load a page
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::EncodeError(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}
