//! Fetch error types.

use crate::error::SdkError;

/// Errors raised while fetching and decoding accounts.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error [{code}]: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// The account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The response could not be parsed.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Account bytes could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[from] SdkError),

    /// Rate limited (429).
    #[error("rate limited")]
    RateLimited {
        /// Retry after seconds, if the server said.
        retry_after: Option<u64>,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,
}

impl ClientError {
    /// Returns true if another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::RateLimited { .. } | Self::Timeout
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}

impl From<base64::DecodeError> for ClientError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Deserialization(format!("account data: {}", err))
    }
}
