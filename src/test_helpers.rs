//! Shared test utilities.
//!
//! Fixture writers produce real image files with the `image` crate so tests
//! can exercise [`RustBackend`](crate::imaging::RustBackend) end to end, and
//! small extractors keep batch assertions readable.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_rgba_png(&tmp.path().join("a.png"), 4, 4, |x, _| [x as u8, 0, 0, 255]);
//!
//! let batch = load(&backend, &paths(&["a.png", "b.png"]), false, &mut |_| {}).unwrap();
//! assert_eq!(record_paths(&batch), vec!["a.png"]);
//! ```

use crate::record::Batch;
use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Fixture writers
// =========================================================================

/// Write an 8-bit RGBA PNG whose pixels come from `pixel(x, y)`.
pub fn write_rgba_png(path: &Path, width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 4]) {
    RgbaImage::from_fn(width, height, |x, y| Rgba(pixel(x, y)))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Write an RGB JPEG with a simple gradient.
pub fn write_rgb_jpeg(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 128]))
        .save(path)
        .unwrap();
}

/// Write a single-channel PNG filled with `value`.
pub fn write_gray_png(path: &Path, width: u32, height: u32, value: u8) {
    GrayImage::from_pixel(width, height, Luma([value]))
        .save(path)
        .unwrap();
}

// =========================================================================
// Extractors
// =========================================================================

pub fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

/// Source paths of a batch, in batch order.
pub fn record_paths(batch: &Batch) -> Vec<String> {
    batch
        .iter()
        .map(|r| r.source_path().display().to_string())
        .collect()
}
