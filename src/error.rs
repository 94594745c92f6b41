//! Error handling for the abacus counter crate.

/// A specialized `Result` type for abacus counter operations.
pub type Result<T> = std::result::Result<T, CounterError>;

/// The main error type for abacus counter operations.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A sample could not be retrieved from the source
    #[error("Sample retrieval failed: {0}")]
    Source(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CounterError {
    /// Create a new sample retrieval error
    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Message carried by the error, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Io(e) => e.to_string(),
            Self::Source(msg) | Self::WebServer(msg) | Self::Config(msg) => msg.clone(),
        }
    }
}
