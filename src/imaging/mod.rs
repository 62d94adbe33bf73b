//! Pixel formats, pixel buffers and the imaging backend.
//!
//! | Piece | Role |
//! |---|---|
//! | [`format`] | Packed format codes and the closed enums they decompose into |
//! | [`descriptor`] | [`describe`]: code → [`PixelFormatDescriptor`] |
//! | [`surface`] | [`Surface`] pixel buffers and the per-pixel codec |
//! | [`calculations`] | Pure geometry (visible-pixel bounds) |
//! | [`backend`] | [`ImageBackend`] trait and the [`Session`] guard |
//! | [`rust_backend`] | [`RustBackend`], the `image` crate implementation |

pub mod backend;
pub mod calculations;
pub mod descriptor;
pub mod format;
pub mod rust_backend;
pub mod surface;

pub use backend::{BackendError, FormatMetadata, ImageBackend, Session};
pub use calculations::Rect;
pub use descriptor::{PixelFormatDescriptor, describe};
pub use format::{FormatError, PixelFormat};
pub use rust_backend::RustBackend;
pub use surface::Surface;
