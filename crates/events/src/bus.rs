//! In-process result bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`AnalysisBus`] carries one [`AnalysisCompleted`] per target per frame.
//! It is designed to be shared via `Arc<AnalysisBus>` between the pipeline
//! and whatever presents results (logs, a UI, tests).

use std::sync::Arc;

use evewatch_core::analysis::AnalysisResult;
use evewatch_core::types::TargetId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// AnalysisCompleted
// ---------------------------------------------------------------------------

/// Notification that one target finished analysing one frame.
///
/// Failed passes are published too; check `result.success`.
#[derive(Debug, Clone)]
pub struct AnalysisCompleted {
    pub target_id: TargetId,
    /// Shared so that every subscriber receives the same allocation.
    pub result: Arc<AnalysisResult>,
}

impl AnalysisCompleted {
    pub fn new(result: AnalysisResult) -> Self {
        Self {
            target_id: result.target_id,
            result: Arc::new(result),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for analysis results.
///
/// # Usage
///
/// ```rust
/// use evewatch_events::bus::AnalysisBus;
///
/// let bus = AnalysisBus::default();
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
#[derive(Debug)]
pub struct AnalysisBus {
    sender: broadcast::Sender<AnalysisCompleted>,
}

impl AnalysisBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed notifications are
    /// dropped and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all current subscribers.
    ///
    /// Without subscribers the notification is silently dropped.
    pub fn publish(&self, event: AnalysisCompleted) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisCompleted> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AnalysisBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
