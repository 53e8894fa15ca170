// ── Core error types ──
//
// User-facing errors from roster-core. Consumers never see reqwest
// internals or JSON parse failures directly; the `From<roster_api::Error>`
// impl translates transport-layer errors into displayable variants.
//
// `Rejected` renders as the bare server message so the UI can surface it
// verbatim, the way the server phrased it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// The request never completed (connection refused, DNS failure).
    #[error("Cannot reach server: {reason}")]
    ConnectionFailed { reason: String },

    /// The request exceeded the transport timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-2xx status and a message.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The server answered 2xx but the body was undecodable.
    #[error("Unexpected response from server: {message}")]
    InvalidResponse { message: String },

    /// Configuration problem (bad URL, unusable settings).
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<roster_api::Error> for CoreError {
    fn from(err: roster_api::Error) -> Self {
        match err {
            roster_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            }
            roster_api::Error::Api { status, message } => CoreError::Rejected { status, message },
            roster_api::Error::Deserialization { message, .. } => {
                CoreError::InvalidResponse { message }
            }
            roster_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
        }
    }
}
