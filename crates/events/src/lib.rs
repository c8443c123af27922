//! Result fan-out and outbound alert delivery for evewatch.
//!
//! - [`AnalysisBus`] - in-process publish/subscribe hub for
//!   [`AnalysisCompleted`] notifications, backed by
//!   `tokio::sync::broadcast`.
//! - [`delivery`] - webhook transport, payload and URL signing.
//! - [`AlertDispatcher`] - rate-limited, signed alert sender that never
//!   propagates delivery failures to its caller.

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{AnalysisBus, AnalysisCompleted};
pub use delivery::webhook::{DeliveryError, ReqwestTransport, WebhookPayload, WebhookTransport};
pub use dispatcher::AlertDispatcher;
