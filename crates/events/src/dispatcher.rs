//! Rate-limited alert dispatcher.
//!
//! [`AlertDispatcher::send`] is safe to call from any number of concurrent
//! pipeline units. All alert kinds share one cooldown: the slot is reserved
//! under a lock before any I/O, so two calls inside the window produce
//! exactly one HTTP attempt. Failures are logged and reported as `false`,
//! never propagated.

use std::sync::Arc;

use chrono::Utc;
use evewatch_core::alert::AlertMessage;
use evewatch_core::config_store::ConfigStore;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::delivery::webhook::{signed_url, WebhookPayload, WebhookTransport};

/// Sends [`AlertMessage`]s to the configured webhook.
pub struct AlertDispatcher {
    config: ConfigStore,
    transport: Arc<dyn WebhookTransport>,
    /// When the last attempt was started; `None` until the first one.
    last_sent: Mutex<Option<Instant>>,
}

impl AlertDispatcher {
    pub fn new(config: ConfigStore, transport: Arc<dyn WebhookTransport>) -> Self {
        Self {
            config,
            transport,
            last_sent: Mutex::new(None),
        }
    }

    /// Deliver `message` if alerts are enabled, an endpoint is configured
    /// and the cooldown has elapsed.
    ///
    /// Returns `true` only when the webhook accepted the request.
    pub async fn send(&self, message: &AlertMessage) -> bool {
        let config = self.config.current();
        let alerts = &config.alerts;

        if !alerts.enabled {
            tracing::debug!(alert_id = %message.id, "Alerts disabled, skipping");
            return false;
        }
        let Some(endpoint) = alerts.endpoint() else {
            tracing::debug!(alert_id = %message.id, "No webhook URL configured, skipping");
            return false;
        };
        if !self.reserve_slot(alerts.min_interval()).await {
            tracing::info!(
                alert_id = %message.id,
                kind = ?message.kind,
                "Alert suppressed by rate limit"
            );
            return false;
        }

        let url = match signed_url(
            endpoint,
            alerts.signing_secret(),
            Utc::now().timestamp_millis(),
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(alert_id = %message.id, error = %e, "Cannot build webhook URL");
                return false;
            }
        };

        let payload = WebhookPayload::markdown(&message.title, message.render_markdown());
        match self
            .transport
            .post(url, &payload, alerts.request_timeout())
            .await
        {
            Ok(()) => {
                tracing::info!(
                    alert_id = %message.id,
                    kind = ?message.kind,
                    title = %message.title,
                    "Alert delivered"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    alert_id = %message.id,
                    kind = ?message.kind,
                    error = %e,
                    "Alert delivery failed"
                );
                false
            }
        }
    }

    /// Send a fixed informational message to verify webhook settings.
    ///
    /// Subject to the same enable flag and cooldown as every other alert.
    pub async fn send_test(&self) -> bool {
        let message = AlertMessage::informational(
            "Test alert",
            "If you can read this, the evewatch webhook is configured correctly.",
        );
        self.send(&message).await
    }

    /// Claim the send slot if at least `min_interval` has passed since the
    /// previous claim.
    async fn reserve_slot(&self, min_interval: Duration) -> bool {
        let mut last = self.last_sent.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            if now.duration_since(previous) < min_interval {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
