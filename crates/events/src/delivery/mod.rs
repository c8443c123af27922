//! External delivery channels for alerts.
//!
//! Only webhooks are supported; the dispatcher talks to them through the
//! [`webhook::WebhookTransport`] seam so tests can substitute a recorder.

pub mod webhook;
