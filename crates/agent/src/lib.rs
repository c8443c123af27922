//! `evewatch-agent` library crate.
//!
//! Host-side collaborators for the pipeline: a directory-backed frame
//! grabber, a Tesseract command-line recogniser and a threshold
//! preprocessor. Re-exported for integration testing; the binary
//! entrypoint lives in `main.rs`.

pub mod grabber;
pub mod preprocess;
pub mod settings;
pub mod tesseract;
