//! Whole-call failures of a relay request.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Upstream model server is unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream model server did not respond in time")]
    Timeout,

    #[error("Upstream rejected the request with status {0}: {1}")]
    UpstreamRejected(StatusCode, String),

    #[error("Upstream response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// Sort a reqwest failure into the relay taxonomy.
    pub fn classify(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout
        } else if err.is_connect() {
            RelayError::Unavailable(err.to_string())
        } else {
            RelayError::Transport(err.to_string())
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Unavailable(_) => "unavailable",
            RelayError::Timeout => "timeout",
            RelayError::UpstreamRejected(..) => "upstream_rejected",
            RelayError::MalformedResponse(_) => "malformed_response",
            RelayError::Transport(_) => "transport",
        }
    }
}
