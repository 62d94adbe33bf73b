//! PNG export of a record's current buffer.

use crate::imaging::{BackendError, ImageBackend};
use crate::naming::export_path;
use crate::record::ImageRecord;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write the record to `dest_dir/<base name>.png`.
///
/// The directory must already exist. On success the output path is stored
/// on the record and returned. An existing file at that path is replaced.
pub fn save(
    backend: &impl ImageBackend,
    record: &mut ImageRecord,
    dest_dir: &Path,
) -> Result<PathBuf, BackendError> {
    let output = export_path(record.source_path(), dest_dir);
    backend.encode_png(record.surface(), &output)?;
    debug!(
        source = %record.source_path().display(),
        output = %output.display(),
        "exported"
    );
    record.set_output_path(output.clone());
    Ok(output)
}
