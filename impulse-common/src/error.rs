//! Error types for the Impulse workspace.

use thiserror::Error;

/// Result type alias using the Impulse error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the trading bot.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exchange-side failure (bad response shape, missing data, refused order)
    #[error("Exchange error: {0}")]
    Exchange(String),

    /// API returned a non-success envelope
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Operation not supported by this exchange client
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is an API envelope error.
    pub const fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Check if this error came from the HTTP transport.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
