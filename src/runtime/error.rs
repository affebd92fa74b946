//! Runtime error types

use thiserror::Error;

/// Failure talking to the chat transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("transport failed: {0}")]
    Failed(String),
}

/// Failure fetching attachment bytes
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob {0} not found")]
    NotFound(String),
    #[error("blob request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure rendering or sending a finished request. Shown to the user as is.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("could not build the request sheet: {0}")]
    Format(String),
    #[error("could not fetch attachment {locator}: {source}")]
    Attachment {
        locator: String,
        #[source]
        source: BlobError,
    },
    #[error("{destination} did not accept the request: {reason}")]
    Notify { destination: String, reason: String },
}

impl DeliveryError {
    pub fn notify(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        DeliveryError::Notify {
            destination: destination.into(),
            reason: reason.into(),
        }
    }
}
