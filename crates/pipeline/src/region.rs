//! Region extraction.
//!
//! A target profile places a capture rectangle on the frame and two
//! sub-rectangles (location name, overview table) inside it. Extraction
//! produces owned copies of those two sub-images so recognition never
//! touches the shared frame buffer.

use evewatch_core::config::TargetProfile;
use evewatch_core::geometry::Rect;
use image::{imageops, RgbaImage};

use crate::frame::Frame;

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("{label} region {rect:?} lies outside the {width}x{height} frame")]
    OutOfBounds {
        label: &'static str,
        rect: Rect,
        width: u32,
        height: u32,
    },

    #[error("{label} region is empty")]
    Empty { label: &'static str },
}

/// Owned crops for one target.
#[derive(Debug, Clone)]
pub struct TargetRegions {
    pub location: RgbaImage,
    pub contacts: RgbaImage,
}

/// Crop the location and contact regions of `profile` out of `frame`.
pub fn extract_regions(frame: &Frame, profile: &TargetProfile) -> Result<TargetRegions, RegionError> {
    let image = frame.image();
    check_bounds(image, "capture", profile.capture)?;

    let location = crop(image, "location", absolute(profile, profile.location_region, "location")?)?;
    let contacts = crop(image, "contacts", absolute(profile, profile.contacts_region, "contacts")?)?;
    Ok(TargetRegions { location, contacts })
}

fn absolute(profile: &TargetProfile, sub: Rect, label: &'static str) -> Result<Rect, RegionError> {
    sub.offset_by(&profile.capture)
        .ok_or(RegionError::OutOfBounds {
            label,
            rect: sub,
            width: profile.capture.width,
            height: profile.capture.height,
        })
}

fn check_bounds(image: &RgbaImage, label: &'static str, rect: Rect) -> Result<(), RegionError> {
    if rect.is_empty() {
        return Err(RegionError::Empty { label });
    }
    if !rect.fits_within(image.width(), image.height()) {
        return Err(RegionError::OutOfBounds {
            label,
            rect,
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

fn crop(image: &RgbaImage, label: &'static str, rect: Rect) -> Result<RgbaImage, RegionError> {
    check_bounds(image, label, rect)?;
    Ok(imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
