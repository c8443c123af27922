//! `evewatch-agent` -- screen-watching threat monitor.
//!
//! Polls a directory of captured game screenshots, reads each configured
//! instance's location and overview table with Tesseract, classifies the
//! contacts and posts webhook alerts when danger is detected.
//!
//! # Environment variables
//!
//! | Variable                    | Required | Default         | Description                         |
//! |-----------------------------|----------|-----------------|-------------------------------------|
//! | `EVEWATCH_CONFIG`           | no       | `evewatch.json` | Monitor configuration (JSON)        |
//! | `EVEWATCH_FRAME_DIR`        | no       | `frames`        | Folder the capture tool writes into |
//! | `EVEWATCH_TESSERACT`        | no       | `tesseract`     | Tesseract executable                |
//! | `EVEWATCH_OCR_LANG`         | no       | `eng`           | Tesseract language pack(s)          |
//! | `EVEWATCH_OCR_TIMEOUT_SECS` | no       | `10`            | Per-region OCR timeout              |

use std::sync::Arc;

use anyhow::Context;
use evewatch_agent::grabber::DirectoryGrabber;
use evewatch_agent::preprocess::ThresholdPreprocessor;
use evewatch_agent::settings::AgentSettings;
use evewatch_agent::tesseract::TesseractRecognizer;
use evewatch_core::config::MonitorConfig;
use evewatch_core::config_store::ConfigStore;
use evewatch_events::bus::{AnalysisBus, AnalysisCompleted};
use evewatch_events::delivery::webhook::ReqwestTransport;
use evewatch_events::dispatcher::AlertDispatcher;
use evewatch_pipeline::{Pipeline, PipelineComponents, PngDirectorySink};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "evewatch_agent=info,evewatch_pipeline=info,evewatch_events=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = AgentSettings::from_env();
    let config = MonitorConfig::load(&settings.config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            settings.config_path.display()
        )
    })?;

    tracing::info!(
        config = %settings.config_path.display(),
        frame_dir = %settings.frame_dir.display(),
        targets = config.enabled_targets().count(),
        max_concurrency = config.max_concurrency,
        "Starting evewatch-agent",
    );

    let interval = config.capture_interval();
    let store = ConfigStore::new(config)?;
    let transport = ReqwestTransport::new().context("Failed to build HTTP client")?;
    let dispatcher = Arc::new(AlertDispatcher::new(store.clone(), Arc::new(transport)));
    let bus = Arc::new(AnalysisBus::default());

    let pipeline = Pipeline::new(
        store.clone(),
        PipelineComponents {
            grabber: Arc::new(DirectoryGrabber::new(&settings.frame_dir)),
            recognizer: Arc::new(TesseractRecognizer::new(
                &settings.tesseract,
                settings.ocr_lang.as_str(),
                settings.ocr_timeout,
            )),
            preprocessor: Arc::new(ThresholdPreprocessor::default()),
            sink: Arc::new(PngDirectorySink::new(store.clone())),
            dispatcher,
            bus: Arc::clone(&bus),
        },
    );

    let cancel = CancellationToken::new();
    let logger = tokio::spawn(log_results(bus.subscribe(), cancel.clone()));

    pipeline
        .start(interval)
        .await
        .context("Failed to start pipeline")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown signal received");

    pipeline.stop().await;
    cancel.cancel();
    let _ = logger.await;

    tracing::info!("evewatch-agent stopped");
    Ok(())
}

/// Log every analysis result until cancelled.
async fn log_results(mut rx: broadcast::Receiver<AnalysisCompleted>, cancel: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(event) if event.result.success => {
                tracing::info!(target_id = event.target_id, "{}", event.result.summary());
            }
            Ok(event) => {
                tracing::warn!(target_id = event.target_id, "{}", event.result.summary());
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Result logger lagging behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
