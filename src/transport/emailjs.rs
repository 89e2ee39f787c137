//! EmailJS REST transport.
//!
//! Posts a template send to the EmailJS API with the destination address as
//! the sole template parameter; the mail body itself lives in the template on
//! the EmailJS side. Payload building is a plain function so the wire shape
//! is testable without a server.

use async_trait::async_trait;
use serde::Serialize;

use super::{MailTransport, TransportError};

/// EmailJS send endpoint.
pub const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Parameters substituted into the mail template.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct TemplateParams {
    /// Destination address.
    pub to_email: String,
}

/// EmailJS send request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct SendPayload {
    /// EmailJS service identifier.
    pub service_id: String,
    /// EmailJS template identifier.
    pub template_id: String,
    /// EmailJS public key; their API names this field `user_id`.
    pub user_id: String,
    /// Template substitution parameters.
    pub template_params: TemplateParams,
}

/// Build the send payload for one delivery.
#[doc(hidden)]
pub fn build_payload(
    service_id: &str,
    template_id: &str,
    public_key: &str,
    to_email: &str,
) -> SendPayload {
    SendPayload {
        service_id: service_id.to_owned(),
        template_id: template_id.to_owned(),
        user_id: public_key.to_owned(),
        template_params: TemplateParams {
            to_email: to_email.to_owned(),
        },
    }
}

// ---------------------------------------------------------------------------
// Transport implementation
// ---------------------------------------------------------------------------

/// Mail transport over the EmailJS REST API.
pub struct EmailJsTransport {
    service_id: String,
    template_id: String,
    public_key: String,
    /// Send endpoint, overridable for tests.
    #[doc(hidden)]
    pub endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for EmailJsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailJsTransport")
            .field("service_id", &self.service_id)
            .field("template_id", &self.template_id)
            .field("public_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl EmailJsTransport {
    /// Create a transport for one EmailJS service/template pair.
    pub fn new(service_id: String, template_id: String, public_key: String) -> Self {
        Self {
            service_id,
            template_id,
            public_key,
            endpoint: EMAILJS_SEND_URL.to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MailTransport for EmailJsTransport {
    async fn send(&self, to_email: &str) -> Result<(), TransportError> {
        let payload = build_payload(
            &self.service_id,
            &self.template_id,
            &self.public_key,
            to_email,
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(())
    }
}

/// Collapse whitespace and cap the length of a rejection body.
fn truncate_body(raw: &str) -> String {
    const MAX_BODY_CHARS: usize = 256;

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_BODY_CHARS {
        let shortened: String = collapsed.chars().take(MAX_BODY_CHARS).collect();
        return format!("{shortened}...[truncated]");
    }
    collapsed
}
