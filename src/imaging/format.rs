//! Packed pixel format codes.
//!
//! A [`PixelFormat`] is an opaque `u32` that packs every structural property
//! of a pixel encoding into bit fields:
//!
//! ```text
//!  31..29  28  27..24  23..20  19..16  15..8  7..0
//!  ------  --  ------  ------  ------  -----  -----
//!    0      1   type    order  layout   bits  bytes
//! ```
//!
//! The `order` field is interpreted through one of three tables depending on
//! the category of `type` (indexed → bitmap order, packed → packed order,
//! array → array order). The `layout` field only means something for packed
//! types. Every table is a closed enum here, so an index that falls outside
//! its table is reported as [`FormatError::InvalidField`] instead of being
//! clamped.
//!
//! Multi-byte pixels are stored little-endian, so [`PixelFormat::ABGR8888`]
//! (the pipeline's canonical format) lays out bytes as `R, G, B, A`.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Prefix shared by every catalog name. [`PixelFormat::short_name`] strips it.
pub const NAME_PREFIX: &str = "PIXELFORMAT_";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("format code {code:#010x}: {field} index {value} is out of range")]
    InvalidField {
        code: u32,
        field: &'static str,
        value: u32,
    },
}

/// Declares a closed enum for one sub-field table of the packed code.
macro_rules! field_table {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $index:literal => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $index),+
        }

        impl $name {
            fn from_index(index: u32) -> Option<Self> {
                match index {
                    $($index => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Lowercase label used in reports.
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }
    };
}

field_table! {
    /// Sample type: how a pixel is stored.
    PixelType {
        Unknown = 0 => "unknown",
        Index1 = 1 => "index1",
        Index4 = 2 => "index4",
        Index8 = 3 => "index8",
        Packed8 = 4 => "packed8",
        Packed16 = 5 => "packed16",
        Packed32 = 6 => "packed32",
        ArrayU8 = 7 => "arrayu8",
        ArrayU16 = 8 => "arrayu16",
        ArrayU32 = 9 => "arrayu32",
        ArrayF16 = 10 => "arrayf16",
        ArrayF32 = 11 => "arrayf32",
    }
}

field_table! {
    /// Bit order inside a byte for indexed types.
    BitmapOrder {
        None = 0 => "none",
        Order4321 = 1 => "4321",
        Order1234 = 2 => "1234",
    }
}

field_table! {
    /// Channel slots of a packed pixel, most significant first.
    PackedOrder {
        None = 0 => "none",
        Xrgb = 1 => "xrgb",
        Rgbx = 2 => "rgbx",
        Argb = 3 => "argb",
        Rgba = 4 => "rgba",
        Xbgr = 5 => "xbgr",
        Bgrx = 6 => "bgrx",
        Abgr = 7 => "abgr",
        Bgra = 8 => "bgra",
    }
}

field_table! {
    /// Component order of an array pixel, first component at the lowest address.
    ArrayOrder {
        None = 0 => "none",
        Rgb = 1 => "rgb",
        Rgba = 2 => "rgba",
        Argb = 3 => "argb",
        Bgr = 4 => "bgr",
        Bgra = 5 => "bgra",
        Abgr = 6 => "abgr",
    }
}

field_table! {
    /// Channel bit widths of a packed pixel, in packed-order slot sequence.
    PackedLayout {
        None = 0 => "none",
        L332 = 1 => "332",
        L4444 = 2 => "4444",
        L1555 = 3 => "1555",
        L5551 = 4 => "5551",
        L565 = 5 => "565",
        L8888 = 6 => "8888",
        L2101010 = 7 => "2101010",
        L1010102 = 8 => "1010102",
    }
}

/// Which order table a [`PixelType`] consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Unknown,
    Indexed,
    Packed,
    Array,
}

impl PixelType {
    pub fn category(self) -> Category {
        match self {
            PixelType::Unknown => Category::Unknown,
            PixelType::Index1 | PixelType::Index4 | PixelType::Index8 => Category::Indexed,
            PixelType::Packed8 | PixelType::Packed16 | PixelType::Packed32 => Category::Packed,
            PixelType::ArrayU8
            | PixelType::ArrayU16
            | PixelType::ArrayU32
            | PixelType::ArrayF16
            | PixelType::ArrayF32 => Category::Array,
        }
    }
}

/// Channel order, tagged by the table it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    None,
    Bitmap(BitmapOrder),
    Packed(PackedOrder),
    Array(ArrayOrder),
}

impl ChannelOrder {
    pub fn label(self) -> &'static str {
        match self {
            ChannelOrder::None => "none",
            ChannelOrder::Bitmap(o) => o.label(),
            ChannelOrder::Packed(o) => o.label(),
            ChannelOrder::Array(o) => o.label(),
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ChannelOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One colour channel (or an unused padding slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
    Padding,
}

impl Channel {
    /// Position in an `[r, g, b, a]` array, `None` for padding.
    pub fn rgba_index(self) -> Option<usize> {
        match self {
            Channel::Red => Some(0),
            Channel::Green => Some(1),
            Channel::Blue => Some(2),
            Channel::Alpha => Some(3),
            Channel::Padding => None,
        }
    }
}

impl PackedOrder {
    /// Slots from the most significant bits down.
    pub fn slots(self) -> Option<[Channel; 4]> {
        use Channel::*;
        match self {
            PackedOrder::None => None,
            PackedOrder::Xrgb => Some([Padding, Red, Green, Blue]),
            PackedOrder::Rgbx => Some([Red, Green, Blue, Padding]),
            PackedOrder::Argb => Some([Alpha, Red, Green, Blue]),
            PackedOrder::Rgba => Some([Red, Green, Blue, Alpha]),
            PackedOrder::Xbgr => Some([Padding, Blue, Green, Red]),
            PackedOrder::Bgrx => Some([Blue, Green, Red, Padding]),
            PackedOrder::Abgr => Some([Alpha, Blue, Green, Red]),
            PackedOrder::Bgra => Some([Blue, Green, Red, Alpha]),
        }
    }
}

impl ArrayOrder {
    /// Components from the lowest address up.
    pub fn channels(self) -> &'static [Channel] {
        use Channel::*;
        match self {
            ArrayOrder::None => &[],
            ArrayOrder::Rgb => &[Red, Green, Blue],
            ArrayOrder::Rgba => &[Red, Green, Blue, Alpha],
            ArrayOrder::Argb => &[Alpha, Red, Green, Blue],
            ArrayOrder::Bgr => &[Blue, Green, Red],
            ArrayOrder::Bgra => &[Blue, Green, Red, Alpha],
            ArrayOrder::Abgr => &[Alpha, Blue, Green, Red],
        }
    }
}

impl PackedLayout {
    /// Bit widths of the four packed-order slots, most significant first.
    pub fn widths(self) -> [u32; 4] {
        match self {
            PackedLayout::None => [0, 0, 0, 0],
            PackedLayout::L332 => [0, 3, 3, 2],
            PackedLayout::L4444 => [4, 4, 4, 4],
            PackedLayout::L1555 => [1, 5, 5, 5],
            PackedLayout::L5551 => [5, 5, 5, 1],
            PackedLayout::L565 => [0, 5, 6, 5],
            PackedLayout::L8888 => [8, 8, 8, 8],
            PackedLayout::L2101010 => [2, 10, 10, 10],
            PackedLayout::L1010102 => [10, 10, 10, 2],
        }
    }
}

/// Red, green, blue and alpha bit masks of a pixel value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

impl ChannelMasks {
    fn set(&mut self, channel: Channel, mask: u32) {
        match channel {
            Channel::Red => self.red = mask,
            Channel::Green => self.green = mask,
            Channel::Blue => self.blue = mask,
            Channel::Alpha => self.alpha = mask,
            Channel::Padding => {}
        }
    }

    /// Masks in `[r, g, b, a]` order.
    pub fn as_array(&self) -> [u32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

/// The three enumerated sub-fields of a packed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decomposition {
    pub pixel_type: PixelType,
    pub order: ChannelOrder,
    pub layout: PackedLayout,
}

/// An opaque packed pixel format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat(pub u32);

const fn define(ty: PixelType, order: u32, layout: PackedLayout, bits: u32, bytes: u32) -> PixelFormat {
    PixelFormat(
        (1 << 28) | ((ty as u32) << 24) | (order << 20) | ((layout as u32) << 16) | (bits << 8) | bytes,
    )
}

macro_rules! catalog {
    ($($name:ident = $ty:ident, $order:expr, $layout:ident, $bits:literal, $bytes:literal;)+) => {
        impl PixelFormat {
            $(pub const $name: PixelFormat =
                define(PixelType::$ty, $order as u32, PackedLayout::$layout, $bits, $bytes);)+
        }

        /// Every named format code, with its full name.
        pub const CATALOG: &[(PixelFormat, &str)] = &[
            $((PixelFormat::$name, concat!("PIXELFORMAT_", stringify!($name))),)+
        ];
    };
}

catalog! {
    INDEX1LSB = Index1, BitmapOrder::Order4321, None, 1, 0;
    INDEX1MSB = Index1, BitmapOrder::Order1234, None, 1, 0;
    INDEX4LSB = Index4, BitmapOrder::Order4321, None, 4, 0;
    INDEX4MSB = Index4, BitmapOrder::Order1234, None, 4, 0;
    INDEX8 = Index8, BitmapOrder::None, None, 8, 1;
    RGB332 = Packed8, PackedOrder::Xrgb, L332, 8, 1;
    XRGB4444 = Packed16, PackedOrder::Xrgb, L4444, 12, 2;
    XBGR4444 = Packed16, PackedOrder::Xbgr, L4444, 12, 2;
    XRGB1555 = Packed16, PackedOrder::Xrgb, L1555, 15, 2;
    XBGR1555 = Packed16, PackedOrder::Xbgr, L1555, 15, 2;
    ARGB4444 = Packed16, PackedOrder::Argb, L4444, 16, 2;
    RGBA4444 = Packed16, PackedOrder::Rgba, L4444, 16, 2;
    ABGR4444 = Packed16, PackedOrder::Abgr, L4444, 16, 2;
    BGRA4444 = Packed16, PackedOrder::Bgra, L4444, 16, 2;
    ARGB1555 = Packed16, PackedOrder::Argb, L1555, 16, 2;
    RGBA5551 = Packed16, PackedOrder::Rgba, L5551, 16, 2;
    ABGR1555 = Packed16, PackedOrder::Abgr, L1555, 16, 2;
    BGRA5551 = Packed16, PackedOrder::Bgra, L5551, 16, 2;
    RGB565 = Packed16, PackedOrder::Xrgb, L565, 16, 2;
    BGR565 = Packed16, PackedOrder::Xbgr, L565, 16, 2;
    RGB24 = ArrayU8, ArrayOrder::Rgb, None, 24, 3;
    BGR24 = ArrayU8, ArrayOrder::Bgr, None, 24, 3;
    XRGB8888 = Packed32, PackedOrder::Xrgb, L8888, 24, 4;
    RGBX8888 = Packed32, PackedOrder::Rgbx, L8888, 24, 4;
    XBGR8888 = Packed32, PackedOrder::Xbgr, L8888, 24, 4;
    BGRX8888 = Packed32, PackedOrder::Bgrx, L8888, 24, 4;
    ARGB8888 = Packed32, PackedOrder::Argb, L8888, 32, 4;
    RGBA8888 = Packed32, PackedOrder::Rgba, L8888, 32, 4;
    ABGR8888 = Packed32, PackedOrder::Abgr, L8888, 32, 4;
    BGRA8888 = Packed32, PackedOrder::Bgra, L8888, 32, 4;
    ARGB2101010 = Packed32, PackedOrder::Argb, L2101010, 32, 4;
    RGB48 = ArrayU16, ArrayOrder::Rgb, None, 48, 6;
    RGBA64 = ArrayU16, ArrayOrder::Rgba, None, 64, 8;
    RGB96_FLOAT = ArrayF32, ArrayOrder::Rgb, None, 96, 12;
    RGBA128_FLOAT = ArrayF32, ArrayOrder::Rgba, None, 128, 16;
}

impl PixelFormat {
    pub const UNKNOWN: PixelFormat = PixelFormat(0);

    /// The single format every record is normalized into.
    pub const CANONICAL: PixelFormat = PixelFormat::ABGR8888;

    pub fn code(self) -> u32 {
        self.0
    }

    fn invalid(self, field: &'static str, value: u32) -> FormatError {
        FormatError::InvalidField {
            code: self.0,
            field,
            value,
        }
    }

    pub fn pixel_type(self) -> Result<PixelType, FormatError> {
        let raw = (self.0 >> 24) & 0x0F;
        PixelType::from_index(raw).ok_or_else(|| self.invalid("type", raw))
    }

    /// Split the code into its enumerated sub-fields.
    ///
    /// The order field is looked up in the table that matches the type's
    /// category; the layout field is only read for packed types.
    pub fn decompose(self) -> Result<Decomposition, FormatError> {
        let pixel_type = self.pixel_type()?;
        let raw_order = (self.0 >> 20) & 0x0F;
        let raw_layout = (self.0 >> 16) & 0x0F;

        let order = match pixel_type.category() {
            Category::Unknown => ChannelOrder::None,
            Category::Indexed => BitmapOrder::from_index(raw_order)
                .map(ChannelOrder::Bitmap)
                .ok_or_else(|| self.invalid("bitmap order", raw_order))?,
            Category::Packed => PackedOrder::from_index(raw_order)
                .map(ChannelOrder::Packed)
                .ok_or_else(|| self.invalid("packed order", raw_order))?,
            Category::Array => ArrayOrder::from_index(raw_order)
                .map(ChannelOrder::Array)
                .ok_or_else(|| self.invalid("array order", raw_order))?,
        };

        let layout = match pixel_type.category() {
            Category::Packed | Category::Array => PackedLayout::from_index(raw_layout)
                .ok_or_else(|| self.invalid("layout", raw_layout))?,
            Category::Unknown | Category::Indexed => PackedLayout::None,
        };

        Ok(Decomposition {
            pixel_type,
            order,
            layout,
        })
    }

    pub fn bits_per_pixel(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    /// Byte field of the code, or the rounded-up bit count for sub-byte indexed codes.
    pub fn bytes_per_pixel(self) -> u32 {
        match self.0 & 0xFF {
            0 => self.bits_per_pixel().div_ceil(8),
            bytes => bytes,
        }
    }

    pub fn is_indexed(self) -> bool {
        matches!(
            self.pixel_type().map(PixelType::category),
            Ok(Category::Indexed)
        )
    }

    pub fn has_alpha(self) -> Result<bool, FormatError> {
        Ok(match self.decompose()?.order {
            ChannelOrder::Packed(order) => matches!(
                order,
                PackedOrder::Argb | PackedOrder::Rgba | PackedOrder::Abgr | PackedOrder::Bgra
            ),
            ChannelOrder::Array(order) => order.channels().contains(&Channel::Alpha),
            ChannelOrder::None | ChannelOrder::Bitmap(_) => false,
        })
    }

    /// Channel bit masks of a single pixel value.
    ///
    /// Packed codes assign the layout widths to the order slots from the most
    /// significant bit down. Byte arrays of at most four bytes get one byte
    /// mask per component. Everything else has no masks.
    pub fn masks(self) -> Result<ChannelMasks, FormatError> {
        let parts = self.decompose()?;
        let mut masks = ChannelMasks::default();

        match parts.order {
            ChannelOrder::Packed(order) => {
                let Some(slots) = order.slots() else {
                    return Ok(masks);
                };
                let widths = parts.layout.widths();
                let mut shift: u32 = widths.iter().sum();
                for (channel, width) in slots.into_iter().zip(widths) {
                    shift -= width;
                    let mask = ((1u64 << width) - 1) as u32;
                    masks.set(channel, mask << shift);
                }
            }
            ChannelOrder::Array(order)
                if parts.pixel_type == PixelType::ArrayU8 && self.bytes_per_pixel() <= 4 =>
            {
                for (i, channel) in order.channels().iter().enumerate() {
                    masks.set(*channel, 0xFF << (8 * i));
                }
            }
            _ => {}
        }

        Ok(masks)
    }

    /// Full catalog name, `PIXELFORMAT_UNKNOWN` for unnamed codes.
    pub fn name(self) -> &'static str {
        CATALOG
            .iter()
            .find(|(format, _)| *format == self)
            .map(|(_, name)| *name)
            .unwrap_or("PIXELFORMAT_UNKNOWN")
    }

    /// Name without the [`NAME_PREFIX`], for narrow report columns.
    pub fn short_name(self) -> &'static str {
        let name = self.name();
        name.strip_prefix(NAME_PREFIX).unwrap_or(name)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
