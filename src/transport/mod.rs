//! Outbound mail transport abstraction.
//!
//! Delivery is a one-shot, fire-and-forget send of a fixed template to one
//! address; the trait keeps the dispatch component independent of the
//! concrete delivery service.

pub mod emailjs;

use async_trait::async_trait;

/// Errors from mail transport calls.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP transport failure.
    #[error("transport request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The delivery service rejected the send.
    #[error("delivery rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },
}

/// One-shot outbound mail delivery.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send the material template to `to_email`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the service is unreachable or rejects
    /// the send.
    async fn send(&self, to_email: &str) -> Result<(), TransportError>;
}
