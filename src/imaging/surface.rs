//! Owned pixel buffers.
//!
//! A [`Surface`] is the decoded pixel data of one image: a byte buffer with
//! rows padded to a 4-byte boundary, tagged with its [`PixelFormat`] and an
//! optional palette for indexed formats.
//!
//! Individual pixels are read and written as normalized RGBA (`[f32; 4]`,
//! each channel in `0.0..=1.0`) through a [`Codec`] built once per format.
//! This is the single path used for format conversion and for encoding
//! formats the PNG writer cannot take directly.

use super::backend::BackendError;
use super::calculations::Rect;
use super::format::{BitmapOrder, Category, Channel, ChannelOrder, PixelFormat, PixelType};

/// Normalized RGBA.
pub type Rgba = [f32; 4];

/// Decoded pixel data with its geometry and format.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
    palette: Option<Vec<[u8; 4]>>,
}

/// Bytes actually occupied by one row of `width` pixels.
///
/// Indexed codes pack sub-byte pixels, so their rows are sized from the bit
/// count. Every other code stores each pixel in its full byte count, which
/// can exceed the significant bits (`XRGB8888` keeps 24 bits in 4 bytes).
fn row_bytes(width: u32, format: PixelFormat) -> usize {
    if format.is_indexed() {
        (width as usize * format.bits_per_pixel() as usize).div_ceil(8)
    } else {
        width as usize * format.bytes_per_pixel() as usize
    }
}

/// Row stride for `width` pixels: the occupied bytes rounded up to 4.
pub fn pitch_for(width: u32, format: PixelFormat) -> usize {
    row_bytes(width, format).next_multiple_of(4)
}

impl Surface {
    /// A zero-filled surface.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, BackendError> {
        format.decompose()?;
        if format.bits_per_pixel() == 0 {
            return Err(BackendError::UnsupportedFormat(format));
        }
        let pitch = pitch_for(width, format);
        Ok(Self {
            width,
            height,
            pitch,
            format,
            pixels: vec![0; pitch * height as usize],
            palette: None,
        })
    }

    /// Build a surface from tightly packed rows (no padding between rows).
    pub fn from_rows(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    ) -> Result<Self, BackendError> {
        let mut surface = Self::new(width, height, format)?;
        let tight = row_bytes(width, format);
        let expected = tight * height as usize;
        if data.len() != expected {
            return Err(BackendError::InvalidSurface(format!(
                "{width}x{height} {} needs {expected} bytes, got {}",
                format.short_name(),
                data.len()
            )));
        }
        if tight > 0 {
            for (y, src) in data.chunks_exact(tight).enumerate() {
                surface.row_mut(y as u32).copy_from_slice(src);
            }
        }
        Ok(surface)
    }

    pub fn with_palette(mut self, palette: Vec<[u8; 4]>) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in bytes.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn palette(&self) -> Option<&[[u8; 4]]> {
        self.palette.as_deref()
    }

    /// Occupied bytes of row `y`, without padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.pixels[start..start + row_bytes(self.width, self.format)]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        let len = row_bytes(self.width, self.format);
        &mut self.pixels[start..start + len]
    }

    /// All rows concatenated without padding.
    pub fn packed_rows(&self) -> Vec<u8> {
        (0..self.height).flat_map(|y| self.row(y).iter().copied()).collect()
    }

    pub fn read_pixel(&self, x: u32, y: u32) -> Result<Rgba, BackendError> {
        let codec = Codec::for_format(self.format)?;
        Ok(codec.read(self.row(y), x, self.palette()))
    }

    pub fn write_pixel(&mut self, x: u32, y: u32, rgba: Rgba) -> Result<(), BackendError> {
        let codec = Codec::for_format(self.format)?;
        codec.write(self.row_mut(y), x, rgba)
    }

    /// Re-encode every pixel into `target`.
    pub fn convert_to(&self, target: PixelFormat) -> Result<Surface, BackendError> {
        let reader = Codec::for_format(self.format)?;
        let writer = Codec::for_format(target)?;
        let mut out = Surface::new(self.width, self.height, target)?;
        for y in 0..self.height {
            let src = self.row(y);
            let dst = out.row_mut(y);
            for x in 0..self.width {
                writer.write(dst, x, reader.read(src, x, self.palette()))?;
            }
        }
        Ok(out)
    }

    /// Copy out the pixels inside `rect`. Sub-byte formats are not supported.
    pub fn crop(&self, rect: Rect) -> Result<Surface, BackendError> {
        if rect.x + rect.width > self.width || rect.y + rect.height > self.height {
            return Err(BackendError::InvalidSurface(format!(
                "crop {rect:?} outside {}x{}",
                self.width, self.height
            )));
        }
        if self.format.is_indexed() && self.format.bits_per_pixel() < 8 {
            return Err(BackendError::UnsupportedFormat(self.format));
        }
        let bpp = self.format.bytes_per_pixel() as usize;
        let mut out = Surface::new(rect.width, rect.height, self.format)?;
        out.palette = self.palette.clone();
        let start = rect.x as usize * bpp;
        let len = rect.width as usize * bpp;
        for y in 0..rect.height {
            let src = &self.row(rect.y + y)[start..start + len];
            out.row_mut(y).copy_from_slice(src);
        }
        Ok(out)
    }
}

/// Storage of one array component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    U8,
    U16,
    U32,
    F32,
}

impl Component {
    fn size(self) -> usize {
        match self {
            Component::U8 => 1,
            Component::U16 => 2,
            Component::U32 | Component::F32 => 4,
        }
    }

    fn read(self, bytes: &[u8]) -> f32 {
        match self {
            Component::U8 => f32::from(bytes[0]) / 255.0,
            Component::U16 => f32::from(u16::from_le_bytes([bytes[0], bytes[1]])) / 65535.0,
            Component::U32 => {
                let v = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (f64::from(v) / f64::from(u32::MAX)) as f32
            }
            Component::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    fn write(self, out: &mut [u8], value: f32) {
        let v = value.clamp(0.0, 1.0);
        match self {
            Component::U8 => out[0] = (v * 255.0).round() as u8,
            Component::U16 => out.copy_from_slice(&((v * 65535.0).round() as u16).to_le_bytes()),
            Component::U32 => {
                let scaled = (f64::from(v) * f64::from(u32::MAX)).round() as u32;
                out.copy_from_slice(&scaled.to_le_bytes());
            }
            Component::F32 => out.copy_from_slice(&v.to_le_bytes()),
        }
    }
}

/// Per-format pixel reader/writer.
#[derive(Debug, Clone, Copy)]
pub enum Codec {
    Indexed {
        bits: u32,
        msb_first: bool,
    },
    Packed {
        bytes: usize,
        masks: [u32; 4],
    },
    Array {
        component: Component,
        channels: &'static [Channel],
    },
}

impl Codec {
    pub fn for_format(format: PixelFormat) -> Result<Self, BackendError> {
        let parts = format.decompose()?;
        match (parts.pixel_type.category(), parts.order) {
            (Category::Indexed, ChannelOrder::Bitmap(order)) => Ok(Codec::Indexed {
                bits: format.bits_per_pixel(),
                // 8-bit indices have no bit order; MSB-first reads them whole.
                msb_first: order != BitmapOrder::Order4321,
            }),
            (Category::Packed, ChannelOrder::Packed(_)) => Ok(Codec::Packed {
                bytes: format.bytes_per_pixel() as usize,
                masks: format.masks()?.as_array(),
            }),
            (Category::Array, ChannelOrder::Array(order)) if !order.channels().is_empty() => {
                let component = match parts.pixel_type {
                    PixelType::ArrayU8 => Component::U8,
                    PixelType::ArrayU16 => Component::U16,
                    PixelType::ArrayU32 => Component::U32,
                    PixelType::ArrayF32 => Component::F32,
                    _ => return Err(BackendError::UnsupportedFormat(format)),
                };
                Ok(Codec::Array {
                    component,
                    channels: order.channels(),
                })
            }
            _ => Err(BackendError::UnsupportedFormat(format)),
        }
    }

    /// Read pixel `x` of a row. Formats without alpha read as opaque.
    pub fn read(&self, row: &[u8], x: u32, palette: Option<&[[u8; 4]]>) -> Rgba {
        match *self {
            Codec::Indexed { bits, msb_first } => {
                let index = read_index(row, x, bits, msb_first);
                let entry = palette
                    .and_then(|p| p.get(index))
                    .copied()
                    .unwrap_or([0, 0, 0, 255]);
                entry.map(|c| f32::from(c) / 255.0)
            }
            Codec::Packed { bytes, masks } => {
                let start = x as usize * bytes;
                let mut buf = [0u8; 4];
                buf[..bytes].copy_from_slice(&row[start..start + bytes]);
                let value = u32::from_le_bytes(buf);
                let mut out = [0.0, 0.0, 0.0, 1.0];
                for (channel, mask) in out.iter_mut().zip(masks) {
                    if mask != 0 {
                        let shift = mask.trailing_zeros();
                        let max = mask >> shift;
                        *channel = ((value & mask) >> shift) as f32 / max as f32;
                    }
                }
                out
            }
            Codec::Array {
                component,
                channels,
            } => {
                let size = component.size();
                let start = x as usize * size * channels.len();
                let mut out = [0.0, 0.0, 0.0, 1.0];
                for (i, channel) in channels.iter().enumerate() {
                    if let Some(slot) = channel.rgba_index() {
                        let offset = start + i * size;
                        out[slot] = component.read(&row[offset..offset + size]);
                    }
                }
                out
            }
        }
    }

    /// Write pixel `x` of a row. Indexed formats cannot be written.
    pub fn write(&self, row: &mut [u8], x: u32, rgba: Rgba) -> Result<(), BackendError> {
        match *self {
            Codec::Indexed { .. } => Err(BackendError::InvalidSurface(
                "cannot write into an indexed surface".into(),
            )),
            Codec::Packed { bytes, masks } => {
                let mut value = 0u32;
                for (channel, mask) in rgba.iter().zip(masks) {
                    if mask != 0 {
                        let shift = mask.trailing_zeros();
                        let max = mask >> shift;
                        let v = (channel.clamp(0.0, 1.0) * max as f32).round() as u32;
                        value |= (v << shift) & mask;
                    }
                }
                let start = x as usize * bytes;
                row[start..start + bytes].copy_from_slice(&value.to_le_bytes()[..bytes]);
                Ok(())
            }
            Codec::Array {
                component,
                channels,
            } => {
                let size = component.size();
                let start = x as usize * size * channels.len();
                for (i, channel) in channels.iter().enumerate() {
                    if let Some(slot) = channel.rgba_index() {
                        let offset = start + i * size;
                        component.write(&mut row[offset..offset + size], rgba[slot]);
                    }
                }
                Ok(())
            }
        }
    }
}

fn read_index(row: &[u8], x: u32, bits: u32, msb_first: bool) -> usize {
    let x = x as usize;
    match bits {
        1 => {
            let byte = row[x / 8];
            let bit = x % 8;
            let shift = if msb_first { 7 - bit } else { bit };
            usize::from((byte >> shift) & 0x01)
        }
        4 => {
            let byte = row[x / 2];
            let high = (x % 2 == 0) == msb_first;
            usize::from(if high { byte >> 4 } else { byte & 0x0F })
        }
        _ => usize::from(row[x]),
    }
}
