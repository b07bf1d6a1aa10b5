//! Error types for publishing snapshots.

use thiserror::Error;

/// Errors that can occur when handing a snapshot to an output.
///
/// None of these are fatal to the publisher: a failed push is logged and
/// the next cycle tries again.
#[derive(Debug, Error)]
pub enum PushError {
    /// Could not reach the collector.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The collector did not answer within the push timeout.
    #[error("Request timed out")]
    Timeout,

    /// The collector answered with a non-success status.
    #[error("Collector returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The gateway endpoint cannot be turned into a push URL.
    #[error("Invalid Pushgateway endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Any other HTTP client failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Writing a file output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the snapshot failed.
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PushError {
    /// Returns true if the failure was a network-level problem (unreachable
    /// or timed out) rather than a response from the collector.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, PushError::Connection(_) | PushError::Timeout)
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PushError::Timeout
        } else if err.is_connect() {
            PushError::Connection(err.to_string())
        } else {
            PushError::Http(err.to_string())
        }
    }
}
