//! Semantic description of a packed pixel format.

use super::backend::{BackendError, ImageBackend};
use super::format::{ChannelMasks, ChannelOrder, PackedLayout, PixelFormat, PixelType};
use serde::Serialize;

/// Everything the report says about a pixel format.
///
/// Built by [`describe`]; a pure function of the format code (and the
/// backend's metadata for that code), so equal codes give equal descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelFormatDescriptor {
    #[serde(skip)]
    pub format: PixelFormat,
    pub sample_type: PixelType,
    pub channel_order: ChannelOrder,
    pub layout: PackedLayout,
    pub bits_per_pixel: u32,
    pub bytes_per_pixel: u32,
    pub has_alpha: bool,
    pub masks: ChannelMasks,
    pub name: &'static str,
}

impl PixelFormatDescriptor {
    /// Name without the common `PIXELFORMAT_` prefix.
    pub fn short_name(&self) -> &'static str {
        self.name
            .strip_prefix(super::format::NAME_PREFIX)
            .unwrap_or(self.name)
    }
}

/// Classify `format` into its semantic fields.
///
/// Type, order and layout come from decomposing the code; bit and byte
/// counts, alpha, masks and name are taken from the backend's metadata.
pub fn describe(
    backend: &impl ImageBackend,
    format: PixelFormat,
) -> Result<PixelFormatDescriptor, BackendError> {
    let parts = format.decompose()?;
    let meta = backend.format_metadata(format)?;
    Ok(PixelFormatDescriptor {
        format,
        sample_type: parts.pixel_type,
        channel_order: parts.order,
        layout: parts.layout,
        bits_per_pixel: meta.bits_per_pixel,
        bytes_per_pixel: meta.bytes_per_pixel,
        has_alpha: meta.has_alpha,
        masks: meta.masks,
        name: meta.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::format::{ArrayOrder, CATALOG, PackedOrder};

    #[test]
    fn describe_canonical() {
        let d = describe(&RustBackend::new(), PixelFormat::ABGR8888).unwrap();
        assert_eq!(d.sample_type, PixelType::Packed32);
        assert_eq!(d.channel_order, ChannelOrder::Packed(PackedOrder::Abgr));
        assert_eq!(d.layout, PackedLayout::L8888);
        assert_eq!(d.bits_per_pixel, 32);
        assert_eq!(d.bytes_per_pixel, 4);
        assert!(d.has_alpha);
        assert_eq!(d.masks.alpha, 0xFF000000);
        assert_eq!(d.name, "PIXELFORMAT_ABGR8888");
        assert_eq!(d.short_name(), "ABGR8888");
    }

    #[test]
    fn describe_rgb24() {
        let d = describe(&RustBackend::new(), PixelFormat::RGB24).unwrap();
        assert_eq!(d.sample_type, PixelType::ArrayU8);
        assert_eq!(d.channel_order, ChannelOrder::Array(ArrayOrder::Rgb));
        assert_eq!(d.layout, PackedLayout::None);
        assert!(!d.has_alpha);
    }

    #[test]
    fn describe_is_deterministic_over_catalog() {
        let backend = RustBackend::new();
        for (format, name) in CATALOG {
            let a = describe(&backend, *format).unwrap();
            let b = describe(&backend, *format).unwrap();
            assert_eq!(a, b, "{name} described differently twice");
            assert_eq!(a.name, *name);
        }
    }

    #[test]
    fn describe_rejects_malformed_code() {
        let bad = PixelFormat((1 << 28) | (3 << 24) | (7 << 20) | (8 << 8) | 1);
        assert!(matches!(
            describe(&RustBackend::new(), bad),
            Err(BackendError::Format(_))
        ));
    }

    #[test]
    fn serializes_labels() {
        let d = describe(&RustBackend::new(), PixelFormat::RGB565).unwrap();
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json["sample_type"], "packed16");
        assert_eq!(json["channel_order"], "xrgb");
        assert_eq!(json["layout"], "565");
        assert_eq!(json["masks"]["red"], 0xF800);
    }
}
