//! Domain types and pure logic for the evewatch threat monitor.
//!
//! Nothing in this crate performs I/O beyond reading a configuration file:
//!
//! - [`classify`] - rule-based ship classification and danger levels.
//! - [`contact_parser`] - OCR text to [`ContactRecord`]s.
//! - [`alert`] / [`analysis`] - immutable messages produced by a pass.
//! - [`config`] / [`config_store`] - configuration snapshot and its
//!   `watch`-backed holder.
//! - [`signing`] - webhook HMAC signatures.

pub mod alert;
pub mod analysis;
pub mod classify;
pub mod config;
pub mod config_store;
pub mod contact_parser;
pub mod error;
pub mod geometry;
pub mod ship;
pub mod signing;
pub mod types;

pub use alert::{AlertKind, AlertMessage};
pub use analysis::AnalysisResult;
pub use classify::{classify, danger_level, RuleSets};
pub use config::{MonitorConfig, PerformanceScope, ScreenshotPolicy, TargetProfile};
pub use config_store::ConfigStore;
pub use error::CoreError;
pub use geometry::Rect;
pub use ship::{ContactRecord, ShipRecord, ShipStatus};
pub use types::{TargetId, Timestamp};
