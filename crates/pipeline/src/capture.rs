//! Periodic frame capture.
//!
//! [`CaptureDriver`] owns one background task that calls
//! [`FrameGrabber::grab`] on a fixed interval and pushes every frame into the
//! shared [`FrameQueue`]. The interval can be retuned while running without
//! restarting the task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::frame::Frame;
use crate::queue::FrameQueue;

/// How long `stop` waits for the capture task to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The capture source cannot be used at all.
    #[error("Capture source unavailable: {0}")]
    Unavailable(String),

    #[error("Capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode captured image: {0}")]
    Decode(String),

    #[error("Capture is already running")]
    AlreadyRunning,
}

// ---------------------------------------------------------------------------
// FrameGrabber
// ---------------------------------------------------------------------------

/// Source of raw frames.
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    /// Check that the source is usable. Called once per `start`.
    async fn prepare(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Grab the current frame. `Ok(None)` means nothing new to report.
    async fn grab(&self) -> Result<Option<Frame>, CaptureError>;
}

// ---------------------------------------------------------------------------
// CaptureDriver
// ---------------------------------------------------------------------------

struct CaptureRun {
    cancel: CancellationToken,
    interval_tx: watch::Sender<Duration>,
    handle: JoinHandle<()>,
}

pub struct CaptureDriver {
    grabber: Arc<dyn FrameGrabber>,
    queue: Arc<FrameQueue>,
    run: Mutex<Option<CaptureRun>>,
}

impl CaptureDriver {
    pub fn new(grabber: Arc<dyn FrameGrabber>, queue: Arc<FrameQueue>) -> Self {
        Self {
            grabber,
            queue,
            run: Mutex::new(None),
        }
    }

    /// Probe the grabber and start polling it every `interval`.
    ///
    /// The task also stops when `parent` is cancelled.
    pub async fn start(
        &self,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Result<(), CaptureError> {
        let mut run = self.run.lock().await;
        if run.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        self.grabber.prepare().await?;

        let cancel = parent.child_token();
        let (interval_tx, interval_rx) = watch::channel(interval);
        let handle = tokio::spawn(capture_loop(
            Arc::clone(&self.grabber),
            Arc::clone(&self.queue),
            interval_rx,
            cancel.clone(),
        ));

        *run = Some(CaptureRun {
            cancel,
            interval_tx,
            handle,
        });
        tracing::info!(interval_ms = interval.as_millis() as u64, "Capture started");
        Ok(())
    }

    /// Change the polling interval of a running capture.
    ///
    /// Returns `false` when capture is not running.
    pub async fn set_interval(&self, interval: Duration) -> bool {
        match self.run.lock().await.as_ref() {
            Some(run) => {
                run.interval_tx.send_replace(interval);
                true
            }
            None => false,
        }
    }

    /// Stop polling. Returns `false` when capture was not running.
    pub async fn stop(&self) -> bool {
        let Some(run) = self.run.lock().await.take() else {
            return false;
        };
        run.cancel.cancel();
        if tokio::time::timeout(STOP_TIMEOUT, run.handle).await.is_err() {
            tracing::warn!("Capture task did not exit in time");
        }
        tracing::info!("Capture stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.run.lock().await.is_some()
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn capture_loop(
    grabber: Arc<dyn FrameGrabber>,
    queue: Arc<FrameQueue>,
    mut interval_rx: watch::Receiver<Duration>,
    cancel: CancellationToken,
) {
    let mut interval = ticker(*interval_rx.borrow_and_update());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let period = *interval_rx.borrow_and_update();
                interval = ticker(period);
                tracing::info!(interval_ms = period.as_millis() as u64, "Capture interval changed");
            }
            _ = interval.tick() => {
                let grabbed = tokio::select! {
                    _ = cancel.cancelled() => break,
                    grabbed = grabber.grab() => grabbed,
                };
                match grabbed {
                    Ok(Some(frame)) => {
                        if !queue.enqueue(frame) {
                            tracing::debug!("Frame queue closed, discarding frame");
                        }
                    }
                    Ok(None) => tracing::trace!("No new frame"),
                    Err(e) => tracing::warn!(error = %e, "Frame capture failed"),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use image::RgbaImage;

    use super::*;

    #[derive(Default)]
    struct CountingGrabber {
        grabs: AtomicUsize,
        unavailable: bool,
    }

    #[async_trait]
    impl FrameGrabber for CountingGrabber {
        async fn prepare(&self) -> Result<(), CaptureError> {
            if self.unavailable {
                return Err(CaptureError::Unavailable("no display".into()));
            }
            Ok(())
        }

        async fn grab(&self) -> Result<Option<Frame>, CaptureError> {
            self.grabs.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Frame::new(RgbaImage::new(2, 2))))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_at_interval_and_retunes() {
        let grabber = Arc::new(CountingGrabber::default());
        let queue = Arc::new(FrameQueue::new(100));
        let driver = CaptureDriver::new(grabber.clone(), queue.clone());
        let cancel = CancellationToken::new();

        driver.start(Duration::from_millis(100), &cancel).await.unwrap();
        // First tick fires immediately, then every 100ms.
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(grabber.grabs.load(Ordering::SeqCst), 5);

        assert!(driver.set_interval(Duration::from_millis(1000)).await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let before = grabber.grabs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(950)).await;
        assert_eq!(grabber.grabs.load(Ordering::SeqCst), before);

        assert!(driver.stop().await);
        assert!(!driver.stop().await);
        assert!(queue.len() >= 5);
    }

    #[tokio::test]
    async fn unavailable_source_fails_start() {
        let grabber = Arc::new(CountingGrabber {
            unavailable: true,
            ..Default::default()
        });
        let driver = CaptureDriver::new(grabber, Arc::new(FrameQueue::new(1)));
        let err = driver
            .start(Duration::from_millis(100), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(err, CaptureError::Unavailable(_));
        assert!(!driver.is_running().await);
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let driver = CaptureDriver::new(
            Arc::new(CountingGrabber::default()),
            Arc::new(FrameQueue::new(1)),
        );
        let cancel = CancellationToken::new();
        driver.start(Duration::from_millis(100), &cancel).await.unwrap();
        assert_matches!(
            driver.start(Duration::from_millis(100), &cancel).await,
            Err(CaptureError::AlreadyRunning)
        );
        assert!(driver.stop().await);
    }

    #[tokio::test]
    async fn parent_cancellation_stops_polling() {
        let grabber = Arc::new(CountingGrabber::default());
        let driver = CaptureDriver::new(grabber.clone(), Arc::new(FrameQueue::new(1)));
        let cancel = CancellationToken::new();
        driver.start(Duration::from_millis(10), &cancel).await.unwrap();
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_cancel = grabber.grabs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(grabber.grabs.load(Ordering::SeqCst), after_cancel);
        assert!(driver.stop().await);
    }
}
