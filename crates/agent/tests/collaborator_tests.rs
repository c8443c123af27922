//! Integration tests for the agent's host-side collaborators.
//!
//! Exercises the directory grabber against a real temporary folder and the
//! Tesseract recogniser's failure paths without requiring Tesseract itself.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

use assert_matches::assert_matches;
use evewatch_agent::grabber::DirectoryGrabber;
use evewatch_agent::tesseract::TesseractRecognizer;
use evewatch_pipeline::{CaptureError, FrameGrabber, RecognitionError, TextRecognizer};
use image::{Rgba, RgbaImage};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_png(path: &Path, width: u32, modified: SystemTime) {
    RgbaImage::from_pixel(width, 4, Rgba([10, 20, 30, 255]))
        .save(path)
        .unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

// ---------------------------------------------------------------------------
// DirectoryGrabber
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_directory_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let grabber = DirectoryGrabber::new(dir.path().join("absent"));
    assert_matches!(grabber.prepare().await, Err(CaptureError::Unavailable(_)));
}

#[tokio::test]
async fn empty_directory_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let grabber = DirectoryGrabber::new(dir.path());
    grabber.prepare().await.unwrap();
    assert!(grabber.grab().await.unwrap().is_none());
}

#[tokio::test]
async fn picks_newest_frame_once() {
    let dir = tempfile::tempdir().unwrap();
    let base = SystemTime::now() - Duration::from_secs(60);
    write_png(&dir.path().join("old.png"), 5, base);
    write_png(&dir.path().join("new.png"), 7, base + Duration::from_secs(10));
    std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

    let grabber = DirectoryGrabber::new(dir.path());
    let frame = grabber.grab().await.unwrap().expect("a frame");
    assert_eq!(frame.width(), 7);

    // Same file again: nothing new.
    assert!(grabber.grab().await.unwrap().is_none());

    write_png(&dir.path().join("newer.png"), 9, base + Duration::from_secs(20));
    let frame = grabber.grab().await.unwrap().expect("a newer frame");
    assert_eq!(frame.width(), 9);
}

#[tokio::test]
async fn corrupt_image_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.png"), b"definitely not png").unwrap();

    let grabber = DirectoryGrabber::new(dir.path());
    assert_matches!(grabber.grab().await, Err(CaptureError::Decode(_)));
}

// ---------------------------------------------------------------------------
// TesseractRecognizer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_tesseract_binary_is_an_io_error() {
    let ocr = TesseractRecognizer::new(
        "/nonexistent/bin/tesseract",
        "eng",
        Duration::from_secs(5),
    );
    let err = ocr.recognize_text(&RgbaImage::new(4, 4)).await.unwrap_err();
    assert_matches!(err, RecognitionError::Io(_));
}
