//! Run orchestration: Loader → Normalizer → BorderCropper → Exporter → Ranker.
//!
//! Every stage finishes a record before the next record starts; the caller
//! gets the whole batch back only after all stages have run, so no partial
//! report can be produced. Progress is reported synchronously through an
//! `FnMut(&PipelineEvent)` callback, which keeps this module free of any
//! output concerns.
//!
//! ## Failure policy
//!
//! | Failure | Effect |
//! |---|---|
//! | decode | record dropped, `LoadFailed` event when `debug` |
//! | record table allocation | [`PipelineError::Allocation`], run aborted |
//! | normalize | [`PipelineError::Normalize`], run aborted |
//! | crop | [`PipelineError::Crop`], run aborted |
//! | destination directory | [`PipelineError::DestDir`], run aborted |
//! | PNG encode | collected in [`RunSummary::export_failures`], run continues |
//! | output path taken earlier in the run, or equal to a source | same as PNG encode |

use crate::export;
use crate::imaging::{BackendError, ImageBackend, Rect};
use crate::load::load;
use crate::naming::export_path;
use crate::output::{Column, ReportFormat, default_columns};
use crate::record::{Batch, ImageRecord};
use crate::transform::{self, CropOutcome};
use std::collections::{HashSet, TryReserveError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot allocate the record table: {0}")]
    Allocation(#[from] TryReserveError),
    #[error("Normalization failed for {}: {source}", path.display())]
    Normalize {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Border crop failed for {}: {source}", path.display())]
    Crop {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Cannot create output directory {}: {source}", path.display())]
    DestDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress notifications delivered during [`run`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    LoadFailed {
        path: PathBuf,
        reason: String,
    },
    Normalized {
        path: PathBuf,
        from: &'static str,
    },
    Cropped {
        path: PathBuf,
        rect: Rect,
    },
    Exported {
        path: PathBuf,
        output: PathBuf,
    },
    ExportFailed {
        path: PathBuf,
        output: PathBuf,
        reason: String,
    },
}

/// Resolved settings for one run, after config file and CLI flags merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub inputs: Vec<PathBuf>,
    pub sort: bool,
    pub debug: bool,
    pub normalize: bool,
    pub crop: bool,
    pub dest_dir: Option<PathBuf>,
    pub columns: Vec<Column>,
    pub report_format: ReportFormat,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            sort: false,
            debug: false,
            normalize: false,
            crop: false,
            dest_dir: None,
            columns: default_columns(),
            report_format: ReportFormat::Table,
        }
    }
}

impl Options {
    /// Cropping works on canonical pixels, so it turns normalization on.
    pub fn normalizes(&self) -> bool {
        self.normalize || self.crop
    }
}

/// One record whose PNG could not be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFailure {
    pub source: PathBuf,
    pub output: PathBuf,
    pub reason: String,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub batch: Batch,
    pub export_failures: Vec<ExportFailure>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.export_failures.is_empty()
    }
}

/// Stable ascending sort by pixel area.
///
/// Records with equal area keep their relative order.
pub fn rank(mut batch: Batch) -> Batch {
    batch.sort_by_key(ImageRecord::area);
    batch
}

fn transform_record(
    backend: &impl ImageBackend,
    record: &mut ImageRecord,
    options: &Options,
    on_event: &mut impl FnMut(&PipelineEvent),
) -> Result<(), PipelineError> {
    if options.normalizes() {
        let from = record.format().short_name();
        let converted =
            transform::normalize(backend, record).map_err(|source| PipelineError::Normalize {
                path: record.source_path().to_path_buf(),
                source,
            })?;
        if converted {
            on_event(&PipelineEvent::Normalized {
                path: record.source_path().to_path_buf(),
                from,
            });
        }
    }

    if options.crop {
        let outcome = transform::crop(backend, record).map_err(|source| PipelineError::Crop {
            path: record.source_path().to_path_buf(),
            source,
        })?;
        match outcome {
            CropOutcome::Cropped(rect) => on_event(&PipelineEvent::Cropped {
                path: record.source_path().to_path_buf(),
                rect,
            }),
            CropOutcome::FullyTransparent => {
                warn!(path = %record.source_path().display(), "fully transparent, not cropped")
            }
            CropOutcome::Unchanged => {}
        }
    }
    Ok(())
}

/// Output paths already written this run, plus the sources they must not hit.
///
/// Base names collide when two inputs share a stem (`a/photo.jpg` and
/// `b/photo.png`), and `--dest-dir .` can point an export at its own source.
/// Both cases are refused instead of silently replacing a file.
struct OutputClaims {
    written: HashSet<PathBuf>,
    sources: HashSet<PathBuf>,
}

impl OutputClaims {
    fn new(inputs: &[PathBuf]) -> Self {
        Self {
            written: HashSet::new(),
            sources: inputs
                .iter()
                .filter_map(|p| std::fs::canonicalize(p).ok())
                .collect(),
        }
    }

    /// Why `output` must not be written, if anything.
    fn conflict(&self, output: &Path) -> Option<String> {
        if self.written.contains(output) {
            return Some(format!(
                "{} was already written by an earlier image",
                output.display()
            ));
        }
        let resolved = std::fs::canonicalize(output).ok()?;
        self.sources
            .contains(&resolved)
            .then(|| "output would overwrite a source image".to_string())
    }
}

fn export_record(
    backend: &impl ImageBackend,
    record: &mut ImageRecord,
    dest_dir: &Path,
    claims: &mut OutputClaims,
    on_event: &mut impl FnMut(&PipelineEvent),
) -> Option<ExportFailure> {
    let output = export_path(record.source_path(), dest_dir);
    let saved = match claims.conflict(&output) {
        Some(reason) => Err(reason),
        None => export::save(backend, record, dest_dir).map_err(|err| err.to_string()),
    };
    match saved {
        Ok(output) => {
            claims.written.insert(output.clone());
            on_event(&PipelineEvent::Exported {
                path: record.source_path().to_path_buf(),
                output,
            });
            None
        }
        Err(reason) => {
            let failure = ExportFailure {
                source: record.source_path().to_path_buf(),
                output,
                reason,
            };
            warn!(
                path = %failure.source.display(),
                output = %failure.output.display(),
                error = %failure.reason,
                "export failed"
            );
            on_event(&PipelineEvent::ExportFailed {
                path: failure.source.clone(),
                output: failure.output.clone(),
                reason: failure.reason.clone(),
            });
            Some(failure)
        }
    }
}

/// Run every requested stage over `options.inputs`.
///
/// The backend must already be initialized (see
/// [`Session`](crate::imaging::Session)).
pub fn run(
    backend: &impl ImageBackend,
    options: &Options,
    on_event: &mut impl FnMut(&PipelineEvent),
) -> Result<RunSummary, PipelineError> {
    let mut batch = load(backend, &options.inputs, options.debug, on_event)?;

    if let Some(dest_dir) = &options.dest_dir {
        std::fs::create_dir_all(dest_dir).map_err(|source| PipelineError::DestDir {
            path: dest_dir.clone(),
            source,
        })?;
    }

    let mut claims = OutputClaims::new(&options.inputs);
    let mut export_failures = Vec::new();
    for record in &mut batch {
        transform_record(backend, record, options, on_event)?;
        if let Some(dest_dir) = &options.dest_dir {
            export_failures.extend(export_record(
                backend,
                record,
                dest_dir,
                &mut claims,
                on_event,
            ));
        }
    }

    let batch = if options.sort { rank(batch) } else { batch };
    info!(
        records = batch.len(),
        export_failures = export_failures.len(),
        "run complete"
    );
    Ok(RunSummary {
        batch,
        export_failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::PixelFormat;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp, blank};
    use crate::test_helpers::{paths, record_paths, write_rgba_png};

    fn options(inputs: &[&str]) -> Options {
        Options {
            inputs: paths(inputs),
            ..Options::default()
        }
    }

    fn run_collecting(
        backend: &MockBackend,
        options: &Options,
    ) -> (Result<RunSummary, PipelineError>, Vec<PipelineEvent>) {
        let mut events = Vec::new();
        let result = run(backend, options, &mut |e: &PipelineEvent| {
            events.push(e.clone())
        });
        (result, events)
    }

    /// ok1 is 10x10 (area 100), ok2 is 10x5 (area 50).
    fn scenario_backend() -> MockBackend {
        MockBackend::with_surfaces(vec![
            ("ok1.png", blank(10, 10, PixelFormat::ABGR8888)),
            ("ok2.png", blank(10, 5, PixelFormat::RGB24)),
        ])
    }

    // =========================================================================
    // Ranker
    // =========================================================================

    #[test]
    fn rank_orders_by_area() {
        let backend = scenario_backend();
        let batch = load(&backend, &paths(&["ok1.png", "ok2.png"]), false, &mut |_| {}).unwrap();
        assert_eq!(record_paths(&rank(batch)), vec!["ok2.png", "ok1.png"]);
    }

    #[test]
    fn rank_is_stable_for_equal_areas() {
        let backend = MockBackend::with_surfaces(vec![
            ("wide.png", blank(20, 5, PixelFormat::RGB24)),
            ("tall.png", blank(5, 20, PixelFormat::RGB24)),
            ("square.png", blank(10, 10, PixelFormat::RGB24)),
            ("tiny.png", blank(2, 2, PixelFormat::RGB24)),
        ]);
        let batch = load(
            &backend,
            &paths(&["wide.png", "tall.png", "square.png", "tiny.png"]),
            false,
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(
            record_paths(&rank(batch)),
            vec!["tiny.png", "wide.png", "tall.png", "square.png"]
        );
    }

    #[test]
    fn rank_empty_batch() {
        assert!(rank(Batch::new()).is_empty());
    }

    // =========================================================================
    // run()
    // =========================================================================

    #[test]
    fn broken_file_is_dropped_silently() {
        let backend = scenario_backend();
        let (result, events) =
            run_collecting(&backend, &options(&["ok1.png", "broken.dat", "ok2.png"]));

        let summary = result.unwrap();
        assert_eq!(record_paths(&summary.batch), vec!["ok1.png", "ok2.png"]);
        assert!(events.is_empty());
        assert!(summary.is_clean());
    }

    #[test]
    fn sort_puts_smaller_area_first() {
        let backend = scenario_backend();
        let opts = Options {
            sort: true,
            ..options(&["ok1.png", "broken.dat", "ok2.png"])
        };
        let (result, _) = run_collecting(&backend, &opts);

        assert_eq!(record_paths(&result.unwrap().batch), vec!["ok2.png", "ok1.png"]);
    }

    #[test]
    fn debug_emits_load_failures() {
        let backend = scenario_backend();
        let opts = Options {
            debug: true,
            ..options(&["ok1.png", "broken.dat"])
        };
        let (_, events) = run_collecting(&backend, &opts);

        assert_eq!(
            events,
            vec![PipelineEvent::LoadFailed {
                path: "broken.dat".into(),
                reason: "Unsupported image format".into(),
            }]
        );
    }

    #[test]
    fn no_stages_means_no_conversions_or_writes() {
        let backend = scenario_backend();
        run_collecting(&backend, &options(&["ok1.png", "ok2.png"]))
            .0
            .unwrap();

        assert!(
            backend
                .get_operations()
                .iter()
                .all(|op| matches!(op, RecordedOp::Decode(_)))
        );
    }

    #[test]
    fn normalize_converts_only_non_canonical() {
        let backend = scenario_backend();
        let opts = Options {
            normalize: true,
            ..options(&["ok1.png", "ok2.png"])
        };
        let (result, events) = run_collecting(&backend, &opts);

        let summary = result.unwrap();
        assert!(
            summary
                .batch
                .iter()
                .all(|r| r.format().format == PixelFormat::CANONICAL)
        );
        assert_eq!(
            events,
            vec![PipelineEvent::Normalized {
                path: "ok2.png".into(),
                from: "RGB24",
            }]
        );
    }

    #[test]
    fn normalization_failure_aborts_run() {
        let backend = MockBackend {
            fail_convert: true,
            ..scenario_backend()
        };
        let opts = Options {
            normalize: true,
            ..options(&["ok2.png", "ok1.png"])
        };
        let (result, _) = run_collecting(&backend, &opts);

        match result {
            Err(PipelineError::Normalize { path, .. }) => assert_eq!(path, Path::new("ok2.png")),
            other => panic!("expected normalize error, got {other:?}"),
        }
        let converts = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Convert { .. }))
            .count();
        assert_eq!(converts, 1);
    }

    #[test]
    fn crop_implies_normalize() {
        let backend = scenario_backend();
        let tmp = tempfile::TempDir::new().unwrap();
        let opts = Options {
            crop: true,
            dest_dir: Some(tmp.path().to_path_buf()),
            ..options(&["ok2.png"])
        };
        let (result, _) = run_collecting(&backend, &opts);

        let summary = result.unwrap();
        assert_eq!(summary.batch[0].format().format, PixelFormat::CANONICAL);
        assert!(backend.get_operations().contains(&RecordedOp::Convert {
            from: PixelFormat::RGB24,
            to: PixelFormat::CANONICAL,
        }));
    }

    #[test]
    fn export_writes_every_record() {
        let backend = scenario_backend();
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let opts = Options {
            dest_dir: Some(out.clone()),
            ..options(&["ok1.png", "ok2.png"])
        };
        let (result, events) = run_collecting(&backend, &opts);

        let summary = result.unwrap();
        assert!(out.is_dir());
        assert_eq!(summary.batch[0].output_path(), Some(out.join("ok1.png").as_path()));
        assert_eq!(summary.batch[1].output_path(), Some(out.join("ok2.png").as_path()));
        assert_eq!(events.len(), 2);
        assert!(
            events
                .iter()
                .all(|e| matches!(e, PipelineEvent::Exported { .. }))
        );
    }

    #[test]
    fn export_failure_is_collected_and_run_continues() {
        let tmp = tempfile::TempDir::new().unwrap();
        let failing = tmp.path().join("ok1.png");
        let mut backend = scenario_backend();
        backend
            .fail_encode
            .insert(failing.to_string_lossy().to_string());
        let opts = Options {
            dest_dir: Some(tmp.path().to_path_buf()),
            ..options(&["ok1.png", "ok2.png"])
        };
        let (result, events) = run_collecting(&backend, &opts);

        let summary = result.unwrap();
        assert_eq!(summary.batch.len(), 2);
        assert_eq!(summary.batch[0].output_path(), None);
        assert_eq!(summary.batch[1].output_path(), Some(tmp.path().join("ok2.png").as_path()));
        assert_eq!(summary.export_failures.len(), 1);
        assert_eq!(summary.export_failures[0].source, PathBuf::from("ok1.png"));
        assert_eq!(summary.export_failures[0].output, failing);
        assert!(matches!(events[0], PipelineEvent::ExportFailed { .. }));
        assert!(!summary.is_clean());
    }

    #[test]
    fn duplicate_base_names_export_once() {
        let backend = MockBackend::with_surfaces(vec![
            ("a/photo.jpg", blank(2, 2, PixelFormat::RGB24)),
            ("b/photo.png", blank(3, 3, PixelFormat::RGB24)),
        ]);
        let tmp = tempfile::TempDir::new().unwrap();
        let opts = Options {
            dest_dir: Some(tmp.path().to_path_buf()),
            ..options(&["a/photo.jpg", "b/photo.png"])
        };
        let (result, events) = run_collecting(&backend, &opts);

        let summary = result.unwrap();
        let output = tmp.path().join("photo.png");
        assert_eq!(summary.batch[0].output_path(), Some(output.as_path()));
        assert_eq!(summary.batch[1].output_path(), None);
        assert_eq!(summary.export_failures.len(), 1);
        assert_eq!(summary.export_failures[0].source, PathBuf::from("b/photo.png"));
        assert_eq!(summary.export_failures[0].output, output);
        assert!(summary.export_failures[0].reason.contains("already written"));
        assert!(matches!(events[1], PipelineEvent::ExportFailed { .. }));

        let encodes = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::EncodePng(_)))
            .count();
        assert_eq!(encodes, 1);
    }

    #[test]
    fn export_never_overwrites_a_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.png");
        write_rgba_png(&source, 2, 2, |_, _| [1, 2, 3, 255]);
        let before = std::fs::read(&source).unwrap();
        let key = source.to_string_lossy().to_string();
        let backend =
            MockBackend::with_surfaces(vec![(key.as_str(), blank(2, 2, PixelFormat::RGB24))]);
        let opts = Options {
            inputs: vec![source.clone()],
            dest_dir: Some(tmp.path().to_path_buf()),
            ..Options::default()
        };
        let (result, _) = run_collecting(&backend, &opts);

        let summary = result.unwrap();
        assert_eq!(summary.export_failures.len(), 1);
        assert_eq!(
            summary.export_failures[0].reason,
            "output would overwrite a source image"
        );
        assert_eq!(std::fs::read(&source).unwrap(), before);
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::EncodePng(_)))
        );
    }

    #[test]
    fn dest_dir_blocked_by_file_is_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("taken");
        std::fs::write(&blocker, b"").unwrap();
        let backend = scenario_backend();
        let opts = Options {
            dest_dir: Some(blocker),
            ..options(&["ok1.png"])
        };

        let (result, _) = run_collecting(&backend, &opts);
        assert!(matches!(result, Err(PipelineError::DestDir { .. })));
    }

    #[test]
    fn end_to_end_with_real_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let framed = tmp.path().join("framed.png");
        write_rgba_png(&framed, 6, 4, |x, y| {
            if (2..4).contains(&x) && y == 1 {
                [200, 100, 50, 255]
            } else {
                [0, 0, 0, 0]
            }
        });
        let plain = tmp.path().join("plain.png");
        write_rgba_png(&plain, 1, 1, |_, _| [1, 1, 1, 255]);
        let broken = tmp.path().join("broken.dat");
        std::fs::write(&broken, b"nope").unwrap();
        let out = tmp.path().join("out");

        let backend = crate::imaging::RustBackend::new();
        let opts = Options {
            inputs: vec![framed.clone(), broken, plain.clone()],
            sort: true,
            crop: true,
            dest_dir: Some(out.clone()),
            ..Options::default()
        };
        let summary = run(&backend, &opts, &mut |_| {}).unwrap();

        let geometry: Vec<(u32, u32)> = summary
            .batch
            .iter()
            .map(|r| (r.width(), r.height()))
            .collect();
        assert_eq!(geometry, vec![(1, 1), (2, 1)]);
        assert_eq!(summary.batch[1].source_path(), framed.as_path());

        let exported = image::open(out.join("framed.png")).unwrap().to_rgba8();
        assert_eq!(exported.dimensions(), (2, 1));
        assert_eq!(exported.get_pixel(0, 0).0, [200, 100, 50, 255]);
        assert!(out.join("plain.png").is_file());
    }
}
