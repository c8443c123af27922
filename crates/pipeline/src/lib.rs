//! Screenshot analysis pipeline.
//!
//! Frames flow one way: a [`CaptureDriver`] polls a [`FrameGrabber`] into the
//! bounded [`FrameQueue`]; the [`Pipeline`] consumer drains it and fans each
//! frame out to one unit of work per enabled target (region extraction,
//! recognition, classification), then hands results to the alert
//! dispatcher, the screenshot sink and the analysis bus.

pub mod capture;
pub mod frame;
pub mod orchestrator;
pub mod queue;
pub mod recognition;
pub mod region;
pub mod sink;

pub use capture::{CaptureDriver, CaptureError, FrameGrabber};
pub use frame::Frame;
pub use orchestrator::{Phase, Pipeline, PipelineComponents, PipelineError};
pub use queue::FrameQueue;
pub use recognition::{
    IdentityPreprocessor, Preprocessor, RecognitionAdapter, RecognitionError, TextRecognizer,
};
pub use region::{extract_regions, RegionError, TargetRegions};
pub use sink::{NullSink, PngDirectorySink, ScreenshotSink};
