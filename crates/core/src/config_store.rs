//! Shared, atomically swapped configuration snapshot.
//!
//! [`ConfigStore`] wraps a `tokio::sync::watch` channel of
//! `Arc<MonitorConfig>`. Readers clone the current `Arc` and never observe a
//! half-updated configuration; long-running tasks subscribe to be woken on
//! every publish.

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::MonitorConfig;
use crate::error::CoreError;

/// Read-mostly holder of the active [`MonitorConfig`].
///
/// Cheap to clone; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    sender: Arc<watch::Sender<Arc<MonitorConfig>>>,
}

impl ConfigStore {
    /// Create a store seeded with `initial`, validating it first.
    pub fn new(initial: MonitorConfig) -> Result<Self, CoreError> {
        initial.validate()?;
        let (sender, _) = watch::channel(Arc::new(initial));
        Ok(Self {
            sender: Arc::new(sender),
        })
    }

    /// The snapshot currently in effect.
    pub fn current(&self) -> Arc<MonitorConfig> {
        self.sender.borrow().clone()
    }

    /// Subscribe to snapshot changes. The receiver starts at the current
    /// snapshot, marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MonitorConfig>> {
        self.sender.subscribe()
    }

    /// Replace the snapshot wholesale. Invalid configurations are rejected
    /// and the previous snapshot stays in effect.
    pub fn publish(&self, config: MonitorConfig) -> Result<(), CoreError> {
        config.validate()?;
        self.sender.send_replace(Arc::new(config));
        Ok(())
    }
}
