//! Per-image unit of work.
//!
//! An [`ImageRecord`] owns exactly one decoded [`Surface`]. Geometry (width,
//! height, row stride, area) is read straight from the surface, so it can
//! never disagree with the buffer. The cached [`PixelFormatDescriptor`] is
//! recomputed whenever the surface is replaced.

use crate::imaging::{BackendError, ImageBackend, PixelFormatDescriptor, Surface, describe};
use std::path::{Path, PathBuf};

/// One image moving through the pipeline.
#[derive(Debug)]
pub struct ImageRecord {
    source_path: PathBuf,
    surface: Surface,
    format: PixelFormatDescriptor,
    output_path: Option<PathBuf>,
}

/// Ordered records of one run. Insertion order is load order until ranked.
pub type Batch = Vec<ImageRecord>;

impl ImageRecord {
    pub fn new(
        backend: &impl ImageBackend,
        source_path: impl Into<PathBuf>,
        surface: Surface,
    ) -> Result<Self, BackendError> {
        let format = describe(backend, surface.format())?;
        Ok(Self {
            source_path: source_path.into(),
            surface,
            format,
            output_path: None,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn format(&self) -> &PixelFormatDescriptor {
        &self.format
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Row stride in bytes.
    pub fn row_stride(&self) -> usize {
        self.surface.pitch()
    }

    /// Pixel count, the ranking key.
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub(crate) fn set_output_path(&mut self, path: PathBuf) {
        self.output_path = Some(path);
    }

    /// Install a new buffer and re-derive the format descriptor.
    ///
    /// The previous buffer is dropped before returning. On error the record
    /// keeps its old buffer.
    pub fn replace_surface(
        &mut self,
        backend: &impl ImageBackend,
        surface: Surface,
    ) -> Result<(), BackendError> {
        self.format = describe(backend, surface.format())?;
        self.surface = surface;
        Ok(())
    }
}
