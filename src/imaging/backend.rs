//! Image decoding/encoding backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the boundary to the imaging library. The
//! pipeline needs exactly four things from it: decode a file into a
//! [`Surface`], convert a surface to another pixel format, report per-format
//! metadata, and write a surface as PNG. It also owns the library's
//! process-wide lifetime through [`init`](ImageBackend::init) and
//! [`shutdown`](ImageBackend::shutdown), which callers reach only through a
//! [`Session`] guard.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::format::{ChannelMasks, FormatError, PixelFormat};
use super::surface::Surface;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Decode(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Unsupported pixel format {} ({:#010x})", .0.name(), .0.code())]
    UnsupportedFormat(PixelFormat),
    #[error("Invalid pixel format: {0}")]
    Format(#[from] FormatError),
    #[error("Invalid surface: {0}")]
    InvalidSurface(String),
    #[error("Imaging subsystem failed to start: {0}")]
    Init(String),
}

/// Per-format facts as the imaging library reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMetadata {
    pub bits_per_pixel: u32,
    pub bytes_per_pixel: u32,
    pub has_alpha: bool,
    pub masks: ChannelMasks,
    pub name: &'static str,
}

/// Trait for imaging backends.
pub trait ImageBackend {
    /// One-time startup. Called by [`Session::open`].
    fn init(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Matching teardown. Called when the [`Session`] drops.
    fn shutdown(&self) {}

    /// Decode an image file.
    fn decode(&self, path: &Path) -> Result<Surface, BackendError>;

    /// Produce a copy of `surface` in the `target` format.
    fn convert(&self, surface: &Surface, target: PixelFormat) -> Result<Surface, BackendError>;

    /// Bits, bytes, alpha, masks and name for a format code.
    fn format_metadata(&self, format: PixelFormat) -> Result<FormatMetadata, BackendError>;

    /// Write `surface` to `path` as PNG.
    fn encode_png(&self, surface: &Surface, path: &Path) -> Result<(), BackendError>;
}

/// Scoped ownership of the backend's process-wide state.
///
/// `open` runs [`ImageBackend::init`] once; dropping the session runs
/// [`ImageBackend::shutdown`] once, whichever way the scope is left.
pub struct Session<'a, B: ImageBackend> {
    backend: &'a B,
}

impl<'a, B: ImageBackend> Session<'a, B> {
    pub fn open(backend: &'a B) -> Result<Self, BackendError> {
        backend.init()?;
        debug!("imaging session opened");
        Ok(Self { backend })
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }
}

impl<B: ImageBackend> Drop for Session<'_, B> {
    fn drop(&mut self) {
        self.backend.shutdown();
        debug!("imaging session closed");
    }
}
