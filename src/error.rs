/// Error types for the wrydb library
use std::fmt;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, WryError>;

/// Main error type for database operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WryError {
    /// I/O errors (file missing or unreadable)
    Io(String),

    /// Header invariants violated; the file is unusable
    Format(String),

    /// A read, string scan or redirect chain walked off the image
    ///
    /// Indicates a corrupt file. Not retryable, but the engine that
    /// produced it remains usable for other lookups.
    OutOfBounds(String),

    /// Query text is not a usable address
    InvalidAddress(String),

    /// Configuration errors (bad config file, engine not configured)
    Config(String),
}

impl WryError {
    /// Returns true for errors raised while opening a database
    pub fn is_fatal(&self) -> bool {
        matches!(self, WryError::Io(_) | WryError::Format(_))
    }
}

impl fmt::Display for WryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WryError::Io(msg) => write!(f, "I/O error: {}", msg),
            WryError::Format(msg) => write!(f, "Format error: {}", msg),
            WryError::OutOfBounds(msg) => write!(f, "Out of bounds: {}", msg),
            WryError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            WryError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WryError {}

impl From<std::io::Error> for WryError {
    fn from(err: std::io::Error) -> Self {
        WryError::Io(err.to_string())
    }
}

impl From<std::net::AddrParseError> for WryError {
    fn from(err: std::net::AddrParseError) -> Self {
        WryError::InvalidAddress(err.to_string())
    }
}

impl From<config::ConfigError> for WryError {
    fn from(err: config::ConfigError) -> Self {
        WryError::Config(err.to_string())
    }
}
