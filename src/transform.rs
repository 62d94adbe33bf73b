//! In-place record transformations: normalization and border crop.
//!
//! Both stages replace the record's buffer wholesale through
//! [`ImageRecord::replace_surface`]; the old buffer is dropped as soon as the
//! new one is installed.

use crate::imaging::calculations::visible_bounds;
use crate::imaging::{BackendError, ImageBackend, PixelFormat, Rect};
use crate::record::ImageRecord;
use tracing::debug;

/// Byte offset of alpha inside a canonical pixel (memory order R, G, B, A).
const CANONICAL_ALPHA_BYTE: usize = 3;

/// Convert the record to [`PixelFormat::CANONICAL`].
///
/// Returns `false` without touching the buffer when the record is already
/// canonical. A conversion error leaves the record unchanged.
pub fn normalize(backend: &impl ImageBackend, record: &mut ImageRecord) -> Result<bool, BackendError> {
    if record.format().format == PixelFormat::CANONICAL {
        return Ok(false);
    }
    let converted = backend.convert(record.surface(), PixelFormat::CANONICAL)?;
    debug!(
        path = %record.source_path().display(),
        from = record.format().short_name(),
        "normalized"
    );
    record.replace_surface(backend, converted)?;
    Ok(true)
}

/// What [`crop`] did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropOutcome {
    /// The buffer was replaced by this window of the original.
    Cropped(Rect),
    /// No transparent border; the buffer was left alone.
    Unchanged,
    /// Every pixel is fully transparent; the buffer was left alone.
    FullyTransparent,
}

/// Trim fully transparent rows and columns from the record's edges.
///
/// The result is the smallest rectangle holding every pixel with non-zero
/// alpha. Images with no such pixel are kept as they are.
///
/// # Panics
///
/// If the record is not in [`PixelFormat::CANONICAL`]; run [`normalize`]
/// first.
pub fn crop(backend: &impl ImageBackend, record: &mut ImageRecord) -> Result<CropOutcome, BackendError> {
    assert_eq!(
        record.format().format,
        PixelFormat::CANONICAL,
        "crop needs a normalized record: {}",
        record.source_path().display()
    );

    let surface = record.surface();
    let (width, height) = (surface.width(), surface.height());
    let bounds = visible_bounds(width, height, |x, y| {
        surface.row(y)[x as usize * 4 + CANONICAL_ALPHA_BYTE] != 0
    });

    let rect = match bounds {
        None => return Ok(CropOutcome::FullyTransparent),
        Some(rect) if rect.is_full(width, height) => return Ok(CropOutcome::Unchanged),
        Some(rect) => rect,
    };

    let cropped = surface.crop(rect)?;
    debug!(
        path = %record.source_path().display(),
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "cropped"
    );
    record.replace_surface(backend, cropped)?;
    Ok(CropOutcome::Cropped(rect))
}
