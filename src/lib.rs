//! # imginfo
//!
//! Batch image inspection. Give it a list of files and it prints one row per
//! decodable image: geometry, row stride and a full breakdown of the pixel
//! format the decoder produced. Optionally it normalizes every image to one
//! canonical format, trims transparent borders and exports the result as PNG.
//!
//! # Architecture: One Pass, Five Stages
//!
//! ```text
//! 1. Load        paths   →  Batch        (undecodable files dropped)
//! 2. Normalize   record  →  record       (any format → ABGR8888)
//! 3. Crop        record  →  record       (trim fully transparent edges)
//! 4. Export      record  →  dest/*.png
//! 5. Rank        Batch   →  Batch        (stable sort by pixel area)
//! ```
//!
//! Stages 2 to 4 run per record, in order, before the next record starts.
//! The report is rendered only after the whole batch is done.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Run options, progress events, ranking and the [`pipeline::run`] driver |
//! | [`load`] | Stage 1: decode paths into a [`record::Batch`] |
//! | [`transform`] | Stages 2 and 3: normalization and border crop |
//! | [`export`] | Stage 4: PNG export |
//! | [`record`] | [`record::ImageRecord`], one image moving through the stages |
//! | [`naming`] | Export filename derivation |
//! | [`output`] | Table and JSON reports, event lines |
//! | [`config`] | Optional TOML config file |
//! | [`imaging`] | Pixel formats, pixel buffers, and the decoding/encoding backend |
//!
//! # Design Decisions
//!
//! ## Exclusive Ownership of Pixel Buffers
//!
//! Every [`record::ImageRecord`] owns its [`imaging::Surface`]. Stages take
//! `&mut ImageRecord` and swap in a whole new surface, so geometry and format
//! metadata are recomputed in one place and a buffer is never shared.
//!
//! ## Closed Format Enums
//!
//! A packed pixel format code is decomposed into closed enums (sample type,
//! channel order, layout). The channel order type is tagged by the table it
//! came from, so an order can never be read from the wrong table, and an
//! out-of-range field is an error rather than a clamped value.
//!
//! ## Backend Behind a Trait
//!
//! Decoding, conversion and PNG encoding go through
//! [`imaging::ImageBackend`]. The production backend wraps the `image`
//! crate; tests swap in a recording mock. The backend's process-wide
//! lifetime is held by an [`imaging::Session`] guard that releases it on
//! every exit path.

pub mod config;
pub mod export;
pub mod imaging;
pub mod load;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;
