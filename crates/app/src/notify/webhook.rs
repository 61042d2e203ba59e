use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;

use roomquote_core::domain::quote::Quote;

use super::{NotificationError, QuoteNotifier};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Roomquote-Signature";

#[derive(Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    quote: &'a Quote,
}

/// POSTs each new quote as JSON. A single attempt per quote.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    secret: Option<SecretString>,
}

impl WebhookNotifier {
    pub fn new(
        url: String,
        secret: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Configuration(e.to_string()))?;
        Ok(Self { client, url, secret })
    }
}

#[async_trait]
impl QuoteNotifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn send_quote_notification(&self, quote: &Quote) -> Result<(), NotificationError> {
        let body = serde_json::to_vec(&WebhookPayload { event: "quote.submitted", quote })
            .map_err(|e| NotificationError::Webhook(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret.expose_secret(), &body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| NotificationError::Webhook(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotificationError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// `sha256=<hex HMAC-SHA256 of body>`, the value of [`SIGNATURE_HEADER`].
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, NotificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotificationError::Configuration(e.to_string()))?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();

    let mut signature = String::with_capacity(7 + digest.len() * 2);
    signature.push_str("sha256=");
    for byte in digest {
        signature.push_str(&format!("{byte:02x}"));
    }
    Ok(signature)
}
