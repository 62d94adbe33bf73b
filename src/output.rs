//! Report rendering and event formatting.
//!
//! # Table report
//!
//! One header row followed by one row per record, in batch order. Every
//! column except `name` is right aligned to a fixed width shared by header
//! and rows, and columns are separated by a single space. `name` (the source
//! path) is unpadded and always printed last so long paths never push other
//! columns out of line.
//!
//! ```text
//!     w     h pitch     type order  layout bits bytes alpha      rmask      gmask      bmask      amask           pixfmt name
//!    10    10    40 packed32  abgr    8888   32     4   yes 0x000000ff 0x0000ff00 0x00ff0000 0xff000000         ABGR8888 ok1.png
//!    10     5    32  arrayu8   rgb    none   24     3    no 0x000000ff 0x0000ff00 0x00ff0000 0x00000000            RGB24 ok2.png
//! ```
//!
//! # JSON report
//!
//! A single array with one object per record, carrying geometry, area, the
//! full format descriptor and the export path (if any).
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns lines or a string) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::pipeline::PipelineEvent;
use crate::record::{Batch, ImageRecord};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One selectable report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    /// Width in pixels
    W,
    /// Height in pixels
    H,
    /// Row stride in bytes
    Pitch,
    /// Sample type
    Type,
    /// Channel order
    Order,
    /// Bit layout
    Layout,
    /// Bits per pixel
    Bits,
    /// Bytes per pixel
    Bytes,
    /// Alpha channel present
    Alpha,
    /// Red mask
    Rmask,
    /// Green mask
    Gmask,
    /// Blue mask
    Bmask,
    /// Alpha mask
    Amask,
    /// Pixel format name
    Pixfmt,
    /// Source path
    Name,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::W,
        Column::H,
        Column::Pitch,
        Column::Type,
        Column::Order,
        Column::Layout,
        Column::Bits,
        Column::Bytes,
        Column::Alpha,
        Column::Rmask,
        Column::Gmask,
        Column::Bmask,
        Column::Amask,
        Column::Pixfmt,
        Column::Name,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Column::W => "w",
            Column::H => "h",
            Column::Pitch => "pitch",
            Column::Type => "type",
            Column::Order => "order",
            Column::Layout => "layout",
            Column::Bits => "bits",
            Column::Bytes => "bytes",
            Column::Alpha => "alpha",
            Column::Rmask => "rmask",
            Column::Gmask => "gmask",
            Column::Bmask => "bmask",
            Column::Amask => "amask",
            Column::Pixfmt => "pixfmt",
            Column::Name => "name",
        }
    }

    /// Right-aligned cell width. `None` for the trailing unpadded column.
    fn width(self) -> Option<usize> {
        match self {
            Column::W | Column::H | Column::Pitch => Some(5),
            Column::Type => Some(8),
            Column::Order => Some(5),
            Column::Layout => Some(7),
            Column::Bits => Some(4),
            Column::Bytes | Column::Alpha => Some(5),
            Column::Rmask | Column::Gmask | Column::Bmask | Column::Amask => Some(10),
            Column::Pixfmt => Some(16),
            Column::Name => None,
        }
    }

    fn cell(self, record: &ImageRecord) -> String {
        let format = record.format();
        match self {
            Column::W => record.width().to_string(),
            Column::H => record.height().to_string(),
            Column::Pitch => record.row_stride().to_string(),
            Column::Type => format.sample_type.to_string(),
            Column::Order => format.channel_order.to_string(),
            Column::Layout => format.layout.to_string(),
            Column::Bits => format.bits_per_pixel.to_string(),
            Column::Bytes => format.bytes_per_pixel.to_string(),
            Column::Alpha => (if format.has_alpha { "yes" } else { "no" }).to_string(),
            Column::Rmask => hex_mask(format.masks.red),
            Column::Gmask => hex_mask(format.masks.green),
            Column::Bmask => hex_mask(format.masks.blue),
            Column::Amask => hex_mask(format.masks.alpha),
            Column::Pixfmt => format.short_name().to_string(),
            Column::Name => record.source_path().display().to_string(),
        }
    }
}

/// Report layout selected with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

pub fn default_columns() -> Vec<Column> {
    Column::ALL.to_vec()
}

fn hex_mask(mask: u32) -> String {
    format!("{mask:#010x}")
}

/// Requested columns with `name` moved to the end. Duplicates are kept.
fn ordered(columns: &[Column]) -> Vec<Column> {
    let (mut rest, names): (Vec<Column>, Vec<Column>) =
        columns.iter().partition(|c| **c != Column::Name);
    rest.extend(names);
    rest
}

fn join_cells(columns: &[Column], mut cell: impl FnMut(Column) -> String) -> String {
    columns
        .iter()
        .map(|&column| {
            let text = cell(column);
            match column.width() {
                Some(width) => format!("{text:>width$}"),
                None => text,
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Table report
// ============================================================================

/// Header row plus one row per record.
pub fn format_report(batch: &Batch, columns: &[Column]) -> Vec<String> {
    let columns = ordered(columns);
    let mut lines = Vec::with_capacity(batch.len() + 1);
    lines.push(join_cells(&columns, |c| c.label().to_string()));
    for record in batch {
        lines.push(join_cells(&columns, |c| c.cell(record)));
    }
    lines
}

/// Print the table report to stdout.
pub fn print_report(batch: &Batch, columns: &[Column]) {
    for line in format_report(batch, columns) {
        println!("{}", line);
    }
}

// ============================================================================
// JSON report
// ============================================================================

#[derive(Serialize)]
struct JsonRow<'a> {
    name: &'a Path,
    width: u32,
    height: u32,
    pitch: usize,
    area: u64,
    pixfmt: &'static str,
    format: &'a crate::imaging::PixelFormatDescriptor,
    output_path: Option<&'a Path>,
}

impl<'a> From<&'a ImageRecord> for JsonRow<'a> {
    fn from(record: &'a ImageRecord) -> Self {
        Self {
            name: record.source_path(),
            width: record.width(),
            height: record.height(),
            pitch: record.row_stride(),
            area: record.area(),
            pixfmt: record.format().short_name(),
            format: record.format(),
            output_path: record.output_path(),
        }
    }
}

/// Pretty-printed JSON array, one object per record.
pub fn format_json(batch: &Batch) -> Result<String, serde_json::Error> {
    let rows: Vec<JsonRow<'_>> = batch.iter().map(JsonRow::from).collect();
    serde_json::to_string_pretty(&rows)
}

/// Print the JSON report to stdout.
pub fn print_json(batch: &Batch) -> Result<(), serde_json::Error> {
    println!("{}", format_json(batch)?);
    Ok(())
}

// ============================================================================
// Pipeline events
// ============================================================================

/// Single display line for a pipeline event.
///
/// `LoadFailed` renders as `path: reason`, the line printed in debug mode.
pub fn format_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::LoadFailed { path, reason } => {
            format!("{}: {}", path.display(), reason)
        }
        PipelineEvent::Normalized { path, from } => {
            format!("{}: normalized from {}", path.display(), from)
        }
        PipelineEvent::Cropped { path, rect } => format!(
            "{}: cropped to {}x{} at ({}, {})",
            path.display(),
            rect.width,
            rect.height,
            rect.x,
            rect.y
        ),
        PipelineEvent::Exported { path, output } => {
            format!("{} \u{2192} {}", path.display(), output.display())
        }
        PipelineEvent::ExportFailed {
            path,
            output,
            reason,
        } => format!(
            "{}: export to {} failed: {}",
            path.display(),
            output.display(),
            reason
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
