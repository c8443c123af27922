//! Webhook transport for markdown robot messages.
//!
//! A message is a single HTTP POST of
//! `{"msgtype":"markdown","markdown":{"title":..,"text":..}}`. When a signing
//! secret is configured the URL additionally carries `timestamp` and `sign`
//! query parameters (see [`evewatch_core::signing`]). Attempts are never
//! retried; the dispatcher rate-limits instead.

use std::time::Duration;

use async_trait::async_trait;
use evewatch_core::signing::{compute_webhook_signature, SIGN_PARAM, TIMESTAMP_PARAM};
pub use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Fallback timeout when a caller does not pass one.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The configured webhook URL could not be parsed.
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownBody {
    pub title: String,
    pub text: String,
}

/// JSON body of a robot webhook call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub msgtype: String,
    pub markdown: MarkdownBody,
}

impl WebhookPayload {
    pub fn markdown(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            msgtype: "markdown".to_string(),
            markdown: MarkdownBody {
                title: title.into(),
                text: text.into(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// URL signing
// ---------------------------------------------------------------------------

/// Build the request URL, appending `timestamp` and `sign` when a secret is
/// given. Both values are percent-encoded; existing query parameters are
/// preserved.
pub fn signed_url(
    base: &str,
    secret: Option<&str>,
    timestamp_millis: i64,
) -> Result<Url, DeliveryError> {
    let mut url = Url::parse(base).map_err(|e| DeliveryError::InvalidUrl(e.to_string()))?;
    if let Some(secret) = secret {
        let sign = compute_webhook_signature(secret, timestamp_millis);
        url.query_pairs_mut()
            .append_pair(TIMESTAMP_PARAM, &timestamp_millis.to_string())
            .append_pair(SIGN_PARAM, &sign);
    }
    Ok(url)
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sends one payload to one URL.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(
        &self,
        url: Url,
        payload: &WebhookPayload,
        timeout: Duration,
    ) -> Result<(), DeliveryError>;
}

/// [`WebhookTransport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post(
        &self,
        url: Url,
        payload: &WebhookPayload,
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const BASE: &str = "https://oapi.example.com/robot/send?access_token=t";

    #[test]
    fn payload_wire_shape() {
        let payload = WebhookPayload::markdown("Alert", "**body**");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "msgtype": "markdown",
                "markdown": { "title": "Alert", "text": "**body**" }
            })
        );
    }

    #[test]
    fn unsigned_url_is_unchanged() {
        let url = signed_url(BASE, None, 1_700_000_000_000).unwrap();
        assert_eq!(url.as_str(), BASE);
    }

    #[test]
    fn signed_url_appends_encoded_signature() {
        let url = signed_url(BASE, Some("abc"), 1_700_000_000_000).unwrap();
        assert_eq!(
            url.as_str(),
            "https://oapi.example.com/robot/send?access_token=t\
             &timestamp=1700000000000\
             &sign=op8PfVzJL3l7ytCWjPLUMemWOtOBySrLOe22d7A7me4%3D"
        );
    }

    #[test]
    fn signed_url_round_trips_sign_value() {
        let url = signed_url(BASE, Some("SEC123"), 1_700_000_000_000).unwrap();
        let sign = url
            .query_pairs()
            .find(|(k, _)| k == SIGN_PARAM)
            .map(|(_, v)| v.into_owned());
        assert_eq!(
            sign.as_deref(),
            Some("lkcPI1uoxBY1gUnCnnPH1Kkru0Hqjo7rFpA3haIVhEQ=")
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert_matches!(
            signed_url("not a url", Some("abc"), 1),
            Err(DeliveryError::InvalidUrl(_))
        );
    }

    #[test]
    fn transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[test]
    fn error_display_http_status() {
        let err = DeliveryError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }
}
