//! Pure Rust imaging backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with content sniffing |
//! | Convert | [`Surface::convert_to`] (per-pixel normalized RGBA codec) |
//! | Format metadata | [`PixelFormat`] bit-field helpers |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//!
//! ## Decoded formats
//!
//! | Decoded colour type | Surface format |
//! |---|---|
//! | L8 | `INDEX8` with a gray palette |
//! | RGB8 | `RGB24` |
//! | LA8, RGBA8 | `ABGR8888` |
//! | L16, RGB16 | `RGB48` |
//! | LA16, RGBA16 | `RGBA64` |
//! | RGB32F | `RGB96_FLOAT` |
//! | RGBA32F | `RGBA128_FLOAT` |
//! | anything else | `ABGR8888` |

use super::backend::{BackendError, FormatMetadata, ImageBackend};
use super::format::{PackedLayout, PixelFormat, PixelType};
use super::surface::Surface;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn gray_palette() -> Vec<[u8; 4]> {
    (0..=255u8).map(|v| [v, v, v, 255]).collect()
}

fn u16_bytes(values: Vec<u16>) -> Vec<u8> {
    values.into_iter().flat_map(u16::to_le_bytes).collect()
}

fn f32_bytes(values: Vec<f32>) -> Vec<u8> {
    values.into_iter().flat_map(f32::to_le_bytes).collect()
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Move decoded pixels into a [`Surface`] of the matching format.
fn into_surface(img: DynamicImage) -> Result<Surface, BackendError> {
    let (width, height) = (img.width(), img.height());
    let color = img.color();
    let surface = match color {
        ColorType::L8 => Surface::from_rows(width, height, PixelFormat::INDEX8, img.as_bytes())?
            .with_palette(gray_palette()),
        ColorType::Rgb8 => {
            Surface::from_rows(width, height, PixelFormat::RGB24, &img.into_rgb8().into_raw())?
        }
        ColorType::L16 | ColorType::Rgb16 => Surface::from_rows(
            width,
            height,
            PixelFormat::RGB48,
            &u16_bytes(img.into_rgb16().into_raw()),
        )?,
        ColorType::La16 | ColorType::Rgba16 => Surface::from_rows(
            width,
            height,
            PixelFormat::RGBA64,
            &u16_bytes(img.into_rgba16().into_raw()),
        )?,
        ColorType::Rgb32F => Surface::from_rows(
            width,
            height,
            PixelFormat::RGB96_FLOAT,
            &f32_bytes(img.into_rgb32f().into_raw()),
        )?,
        ColorType::Rgba32F => Surface::from_rows(
            width,
            height,
            PixelFormat::RGBA128_FLOAT,
            &f32_bytes(img.into_rgba32f().into_raw()),
        )?,
        _ => Surface::from_rows(
            width,
            height,
            PixelFormat::ABGR8888,
            &img.into_rgba8().into_raw(),
        )?,
    };
    debug!(?color, format = surface.format().short_name(), "decoded");
    Ok(surface)
}

/// Whether a format carries more than 8 bits in some channel.
fn is_deep(format: PixelFormat) -> bool {
    let Ok(parts) = format.decompose() else {
        return false;
    };
    matches!(
        parts.pixel_type,
        PixelType::ArrayU16 | PixelType::ArrayU32 | PixelType::ArrayF16 | PixelType::ArrayF32
    ) || matches!(
        parts.layout,
        PackedLayout::L2101010 | PackedLayout::L1010102
    )
}

/// Build an image the PNG encoder accepts.
///
/// The canonical format and `RGB24` map straight onto `image` buffers; other
/// formats go through the pixel codec into 8- or 16-bit RGBA.
fn to_dynamic(surface: &Surface) -> Result<DynamicImage, BackendError> {
    let (width, height) = (surface.width(), surface.height());
    let size_error = || BackendError::InvalidSurface("pixel buffer size mismatch".into());

    if surface.format() == PixelFormat::ABGR8888 {
        return RgbaImage::from_raw(width, height, surface.packed_rows())
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(size_error);
    }
    if surface.format() == PixelFormat::RGB24 {
        return RgbImage::from_raw(width, height, surface.packed_rows())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(size_error);
    }

    if is_deep(surface.format()) {
        let rgba = surface.convert_to(PixelFormat::RGBA64)?.packed_rows();
        let samples: Vec<u16> = rgba
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        image::ImageBuffer::from_raw(width, height, samples)
            .map(DynamicImage::ImageRgba16)
            .ok_or_else(size_error)
    } else {
        let rgba = surface.convert_to(PixelFormat::ABGR8888)?.packed_rows();
        RgbaImage::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(size_error)
    }
}

/// Encode and save as PNG.
fn save_png(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    img.write_with_encoder(PngEncoder::new(writer))
        .map_err(|e| BackendError::Encode(e.to_string()))
}

impl ImageBackend for RustBackend {
    fn init(&self) -> Result<(), BackendError> {
        if !ImageFormat::Png.reading_enabled() || !ImageFormat::Png.writing_enabled() {
            return Err(BackendError::Init("PNG codec is not compiled in".into()));
        }
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Surface, BackendError> {
        into_surface(load_image(path)?)
    }

    fn convert(&self, surface: &Surface, target: PixelFormat) -> Result<Surface, BackendError> {
        surface.convert_to(target)
    }

    fn format_metadata(&self, format: PixelFormat) -> Result<FormatMetadata, BackendError> {
        Ok(FormatMetadata {
            bits_per_pixel: format.bits_per_pixel(),
            bytes_per_pixel: format.bytes_per_pixel(),
            has_alpha: format.has_alpha()?,
            masks: format.masks()?,
            name: format.name(),
        })
    }

    fn encode_png(&self, surface: &Surface, path: &Path) -> Result<(), BackendError> {
        save_png(&to_dynamic(surface)?, path)
    }
}
