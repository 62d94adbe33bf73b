//! Loader: file paths → [`Batch`].
//!
//! Decode failures are expected (unsupported files, typos, truncated
//! downloads) and never stop the run. A failing path is dropped from the
//! batch, logged at debug level, and reported through the event callback
//! when `debug` is on. Surviving records keep the relative order of their
//! input paths.

use crate::imaging::{BackendError, ImageBackend};
use crate::pipeline::{PipelineError, PipelineEvent};
use crate::record::{Batch, ImageRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn load_one(backend: &impl ImageBackend, path: &Path) -> Result<ImageRecord, BackendError> {
    let surface = backend.decode(path)?;
    ImageRecord::new(backend, path, surface)
}

/// Decode every path, keeping the ones that succeed.
///
/// Only fails if the record table itself cannot be allocated.
pub fn load(
    backend: &impl ImageBackend,
    paths: &[PathBuf],
    debug: bool,
    on_event: &mut impl FnMut(&PipelineEvent),
) -> Result<Batch, PipelineError> {
    let mut batch = Batch::new();
    batch.try_reserve_exact(paths.len())?;

    for path in paths {
        match load_one(backend, path) {
            Ok(record) => {
                debug!(
                    path = %path.display(),
                    width = record.width(),
                    height = record.height(),
                    format = record.format().short_name(),
                    "loaded"
                );
                batch.push(record);
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping undecodable file");
                if debug {
                    on_event(&PipelineEvent::LoadFailed {
                        path: path.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    info!(loaded = batch.len(), requested = paths.len(), "load complete");
    Ok(batch)
}
