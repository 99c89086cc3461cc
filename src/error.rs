//! Error types for sqs-statsd

use std::fmt;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sqs-statsd
#[derive(Debug)]
pub enum Error {
    /// Listing the metric catalog failed
    Catalog(String),
    /// Fetching the statistics of a single metric failed
    Fetch(String),
    /// StatsD socket errors
    Sink(std::io::Error),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Catalog(e) => write!(f, "could not list metrics: {}", e),
            Error::Fetch(e) => write!(f, "could not get metric statistics: {}", e),
            Error::Sink(e) => write!(f, "statsd socket error: {}", e),
            Error::Config(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Sink(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Sink(e)
    }
}
