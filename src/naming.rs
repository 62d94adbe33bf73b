//! Output filename derivation for exported images.
//!
//! Exported files are named after the source file: directory components are
//! dropped, then everything after the last `.` is dropped, then the export
//! suffix is appended.
//!
//! - `a/b/photo.jpg` → `photo.png`
//! - `a/b/photo` → `photo.png`
//! - `scans/page.01.tiff` → `page.01.png`
//! - `.hidden` → `.hidden.png` (a leading dot starts the name, not a suffix)

use std::path::{Path, PathBuf};

/// Suffix given to every exported file.
pub const EXPORT_EXTENSION: &str = "png";

/// Base name of `source`: last path component with its final suffix removed.
pub fn base_name(source: &Path) -> String {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name,
    }
}

/// Full export path for `source` inside `dest_dir`.
pub fn export_path(source: &Path, dest_dir: &Path) -> PathBuf {
    dest_dir.join(format!("{}.{}", base_name(source), EXPORT_EXTENSION))
}
