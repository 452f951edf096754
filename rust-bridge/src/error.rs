//! Error types.
//!
//! Only [`RequestError`] reaches the HTTP boundary. [`ApiError`] is always
//! recovered inside the dispatcher so one bad recipient never blocks the
//! rest of a batch.

use thiserror::Error;

/// The inbound body could not be decoded at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty request received")]
    Empty,

    #[error("invalid JSON received: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A call to the Mautic API failed before a response arrived.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("API transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The SNS subscription handshake failed.
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("subscription confirmation has no SubscribeURL")]
    MissingUrl,

    #[error("failed to confirm SNS subscription: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to confirm SNS subscription: HTTP {0}")]
    Status(u16),
}

/// Failures that abort a request with a 500.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmError),
}
