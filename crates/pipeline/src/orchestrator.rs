//! Pipeline orchestrator.
//!
//! [`Pipeline`] owns the run/stop lifecycle. While running it keeps three
//! kinds of tasks on one [`TaskTracker`]:
//!
//! - the consumer loop, which drains the [`FrameQueue`] one frame at a time;
//! - one unit of work per enabled target per frame, gated by a semaphore of
//!   `max_concurrency` permits;
//! - a configuration watcher that retunes capture when the snapshot changes.
//!
//! A failing or panicking unit becomes a failed [`AnalysisResult`]; it never
//! takes siblings or the consumer loop down with it. `stop` cancels every
//! task through a shared [`CancellationToken`] and waits for them for at most
//! the grace period.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use evewatch_core::alert::AlertMessage;
use evewatch_core::analysis::AnalysisResult;
use evewatch_core::classify::classify;
use evewatch_core::config::{MonitorConfig, PerformanceScope, TargetProfile};
use evewatch_core::config_store::ConfigStore;
use evewatch_core::ship::ShipRecord;
use evewatch_events::bus::{AnalysisBus, AnalysisCompleted};
use evewatch_events::dispatcher::AlertDispatcher;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::capture::{CaptureDriver, CaptureError, FrameGrabber};
use crate::frame::Frame;
use crate::queue::FrameQueue;
use crate::recognition::{Preprocessor, RecognitionAdapter, RecognitionError, TextRecognizer};
use crate::region::{extract_regions, RegionError};
use crate::sink::ScreenshotSink;

/// Default upper bound on how long `stop` waits for in-flight work.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Pipeline is already running")]
    AlreadyRunning,

    #[error("Capture interval must be greater than zero")]
    InvalidInterval,

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(#[source] CaptureError),
}

/// Why a single target's pass failed.
#[derive(Debug, thiserror::Error)]
enum UnitError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("Pipeline stopping")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct RunHandles {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

struct PipelineState {
    phase: Phase,
    run: Option<RunHandles>,
}

/// Collaborators the pipeline drives.
pub struct PipelineComponents {
    pub grabber: Arc<dyn FrameGrabber>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub preprocessor: Arc<dyn Preprocessor>,
    pub sink: Arc<dyn ScreenshotSink>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub bus: Arc<AnalysisBus>,
}

/// Everything the spawned tasks need, shared behind one `Arc`.
struct Shared {
    config: ConfigStore,
    queue: Arc<FrameQueue>,
    capture: CaptureDriver,
    recognition: RecognitionAdapter,
    sink: Arc<dyn ScreenshotSink>,
    dispatcher: Arc<AlertDispatcher>,
    bus: Arc<AnalysisBus>,
    /// Capture interval in effect, in nanoseconds.
    interval_nanos: AtomicU64,
}

impl Shared {
    fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::Relaxed))
    }

    fn set_interval(&self, interval: Duration) {
        let nanos = u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX);
        self.interval_nanos.store(nanos, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    shared: Arc<Shared>,
    state: Mutex<PipelineState>,
    grace_period: Duration,
}

impl Pipeline {
    pub fn new(config: ConfigStore, components: PipelineComponents) -> Self {
        let snapshot = config.current();
        let queue = Arc::new(FrameQueue::new(snapshot.queue_capacity));
        let shared = Shared {
            capture: CaptureDriver::new(components.grabber, Arc::clone(&queue)),
            recognition: RecognitionAdapter::new(components.recognizer, components.preprocessor),
            sink: components.sink,
            dispatcher: components.dispatcher,
            bus: components.bus,
            interval_nanos: AtomicU64::new(0),
            queue,
            config,
        };
        shared.set_interval(snapshot.capture_interval());
        Self {
            shared: Arc::new(shared),
            state: Mutex::new(PipelineState {
                phase: Phase::Stopped,
                run: None,
            }),
            grace_period: DEFAULT_STOP_GRACE,
        }
    }

    /// Override how long `stop` waits for in-flight work.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    // Never held across an await.
    fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn current_interval(&self) -> Duration {
        self.shared.interval()
    }

    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.shared.queue
    }

    /// Start capturing every `interval` and analysing frames.
    pub async fn start(&self, interval: Duration) -> Result<(), PipelineError> {
        if interval.is_zero() {
            return Err(PipelineError::InvalidInterval);
        }
        {
            let mut state = self.state();
            if state.phase != Phase::Stopped {
                return Err(PipelineError::AlreadyRunning);
            }
            state.phase = Phase::Starting;
        }

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let config_rx = self.shared.config.subscribe();
        self.shared.queue.reopen();

        if let Err(e) = self.shared.capture.start(interval, &cancel).await {
            tracing::error!(error = %e, "Failed to start capture");
            self.shared.queue.close();
            self.state().phase = Phase::Stopped;
            return Err(PipelineError::CaptureUnavailable(e));
        }

        tracker.spawn(consume_frames(
            Arc::clone(&self.shared),
            cancel.clone(),
            tracker.clone(),
        ));
        self.shared.set_interval(interval);
        tracker.spawn(watch_config(
            Arc::clone(&self.shared),
            config_rx,
            cancel.clone(),
        ));

        {
            let mut state = self.state();
            state.phase = Phase::Running;
            state.run = Some(RunHandles { cancel, tracker });
        }
        tracing::info!(interval_ms = interval.as_millis() as u64, "Pipeline started");
        Ok(())
    }

    /// Stop the pipeline. Returns `false` if it was not running.
    ///
    /// Waits at most the grace period for in-flight units; the pipeline is
    /// `Stopped` afterwards whether or not they finished.
    pub async fn stop(&self) -> bool {
        let run = {
            let mut state = self.state();
            if state.phase != Phase::Running {
                return false;
            }
            state.phase = Phase::Stopping;
            state.run.take()
        };

        tracing::info!("Stopping pipeline");
        if let Some(run) = run {
            run.cancel.cancel();
            self.shared.queue.close();
            self.shared.capture.stop().await;

            run.tracker.close();
            if tokio::time::timeout(self.grace_period, run.tracker.wait())
                .await
                .is_err()
            {
                tracing::warn!(
                    grace_ms = self.grace_period.as_millis() as u64,
                    remaining = run.tracker.len(),
                    "In-flight analysis did not finish within the grace period"
                );
            }
        }

        self.state().phase = Phase::Stopped;
        tracing::info!("Pipeline stopped");
        true
    }
}

// ---------------------------------------------------------------------------
// Config watcher
// ---------------------------------------------------------------------------

/// Applies config published after `rx` was taken.
async fn watch_config(
    shared: Arc<Shared>,
    mut rx: watch::Receiver<Arc<MonitorConfig>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();

                shared.queue.set_capacity(snapshot.queue_capacity);

                let old_interval = shared.interval();
                let new_interval = snapshot.capture_interval();
                if new_interval != old_interval && shared.capture.set_interval(new_interval).await {
                    shared.set_interval(new_interval);
                    tracing::info!(
                        old_ms = old_interval.as_millis() as u64,
                        new_ms = new_interval.as_millis() as u64,
                        "Capture interval retuned"
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Consumer loop
// ---------------------------------------------------------------------------

async fn consume_frames(shared: Arc<Shared>, cancel: CancellationToken, tracker: TaskTracker) {
    tracing::debug!("Frame consumer started");
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = shared.queue.dequeue() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        process_frame(&shared, frame, &cancel, &tracker).await;
    }
    tracing::debug!("Frame consumer stopped");
}

/// Fan one frame out to every enabled, valid target and publish the
/// results.
async fn process_frame(
    shared: &Arc<Shared>,
    frame: Frame,
    cancel: &CancellationToken,
    tracker: &TaskTracker,
) {
    let started = Instant::now();
    let config = shared.config.current();
    let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

    let mut units: Vec<(TargetProfile, Instant, JoinHandle<AnalysisResult>)> = Vec::new();
    for profile in config.enabled_targets() {
        if let Err(e) = profile.validate() {
            tracing::warn!(target_id = profile.id, error = %e, "Skipping invalid target profile");
            continue;
        }

        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let unit_started = Instant::now();
        let handle = tracker.spawn({
            let shared = Arc::clone(shared);
            let config = Arc::clone(&config);
            let profile = profile.clone();
            let frame = frame.clone();
            let cancel = cancel.clone();
            async move {
                let _permit = permit;
                run_unit(&shared, &config, &profile, &frame, &cancel).await
            }
        });
        units.push((profile.clone(), unit_started, handle));
    }

    for (profile, unit_started, handle) in units {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(target_id = profile.id, error = %e, "Analysis task aborted");
                let reason = if e.is_panic() {
                    "analysis task panicked".to_string()
                } else {
                    format!("analysis task aborted: {e}")
                };
                let elapsed = unit_started.elapsed();
                if !cancel.is_cancelled() {
                    check_unit_budget(shared, &config, &profile, elapsed).await;
                }
                AnalysisResult::failure(
                    profile.id,
                    profile.name.as_str(),
                    reason,
                    elapsed,
                    frame.timestamp(),
                )
            }
        };
        shared.bus.publish(AnalysisCompleted::new(result));
    }

    let elapsed = started.elapsed();
    if config.performance.scope == PerformanceScope::PerFrame
        && elapsed > config.performance.threshold()
    {
        tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Frame analysis over budget");
        shared
            .dispatcher
            .send(&AlertMessage::performance(None, elapsed, config.performance.threshold()))
            .await;
    }
}

// ---------------------------------------------------------------------------
// Per-target unit
// ---------------------------------------------------------------------------

/// Analyse one frame for one target and run the side effects.
async fn run_unit(
    shared: &Shared,
    config: &MonitorConfig,
    profile: &TargetProfile,
    frame: &Frame,
    cancel: &CancellationToken,
) -> AnalysisResult {
    let started = Instant::now();

    let outcome = tokio::select! {
        _ = cancel.cancelled() => Err(UnitError::Cancelled),
        outcome = analyse(&shared.recognition, config, profile, frame) => outcome,
    };

    let elapsed = started.elapsed();
    let result = match outcome {
        Ok((location, ships)) => AnalysisResult::success(
            profile.id,
            profile.name.as_str(),
            location,
            ships,
            elapsed,
            frame.timestamp(),
        ),
        Err(e) => {
            tracing::warn!(target_id = profile.id, error = %e, "Target analysis failed");
            AnalysisResult::failure(
                profile.id,
                profile.name.as_str(),
                e.to_string(),
                elapsed,
                frame.timestamp(),
            )
        }
    };
    tracing::debug!(target_id = profile.id, "{}", result.summary());

    if cancel.is_cancelled() {
        return result;
    }

    if result.contains_dangerous && result.danger_level >= config.danger_threshold {
        tracing::info!(
            target_id = profile.id,
            location = %result.location,
            danger_level = result.danger_level,
            "Dangerous ships detected"
        );
        let alert =
            AlertMessage::ship_danger(profile.id, &profile.name, &result.location, &result.ships);
        shared.dispatcher.send(&alert).await;
    }

    if result.success
        && config
            .screenshots
            .policy
            .should_save(result.contains_dangerous)
    {
        shared.sink.save(frame, profile.id, &result.location).await;
    }

    // Applies to failed passes too.
    check_unit_budget(shared, config, profile, elapsed).await;

    result
}

/// Per-target performance alert. Runs for every finished unit, including
/// failed and panicked ones.
async fn check_unit_budget(
    shared: &Shared,
    config: &MonitorConfig,
    profile: &TargetProfile,
    elapsed: Duration,
) {
    if config.performance.scope != PerformanceScope::PerTarget
        || elapsed <= config.performance.threshold()
    {
        return;
    }
    tracing::warn!(
        target_id = profile.id,
        elapsed_ms = elapsed.as_millis() as u64,
        "Target analysis over budget"
    );
    let alert =
        AlertMessage::performance(Some(profile.id), elapsed, config.performance.threshold());
    shared.dispatcher.send(&alert).await;
}

async fn analyse(
    recognition: &RecognitionAdapter,
    config: &MonitorConfig,
    profile: &TargetProfile,
    frame: &Frame,
) -> Result<(String, Vec<ShipRecord>), UnitError> {
    let regions = extract_regions(frame, profile)?;
    let location = recognition.recognize_location(&regions.location).await;
    let contacts = recognition.recognize_contacts(&regions.contacts).await?;
    let ships = contacts
        .iter()
        .map(|contact| classify(contact, &config.rules))
        .collect();
    Ok((location, ships))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
