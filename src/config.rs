//! Optional configuration file.
//!
//! A TOML file passed with `--config` presets any run option. Command-line
//! flags are applied on top: boolean flags can only switch a feature on,
//! while `--dest-dir`, `--columns` and `--format` replace the file value.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [pipeline]
//! sort = false          # Order the report by pixel area
//! debug = false         # Print a line for every file that fails to decode
//! normalize = false     # Convert every image to the canonical format
//! crop = false          # Trim transparent borders (needs dest_dir)
//! # dest_dir = "out"    # Export every image as PNG into this directory
//!
//! [report]
//! columns = ["w", "h", "pitch", "pixfmt", "name"]
//! format = "table"      # "table" or "json"
//! ```
//!
//! Unknown keys are rejected so typos surface immediately.

use crate::output::{Column, ReportFormat, default_columns};
use crate::pipeline::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Contents of a config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Which stages run and where exports go.
    pub pipeline: PipelineConfig,
    /// What the final report looks like.
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub sort: bool,
    pub debug: bool,
    pub normalize: bool,
    pub crop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub columns: Vec<Column>,
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            format: ReportFormat::Table,
        }
    }
}

impl FileConfig {
    /// Reject values that parse but cannot drive a run.
    ///
    /// `crop` without `dest_dir` is not checked here because the command line
    /// may still supply the directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report.columns.is_empty() {
            return Err(ConfigError::Validation(
                "report.columns must not be empty".into(),
            ));
        }
        if self
            .pipeline
            .dest_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            return Err(ConfigError::Validation(
                "pipeline.dest_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Run options for `inputs`, before command-line overrides.
    pub fn into_options(self, inputs: Vec<PathBuf>) -> Options {
        Options {
            inputs,
            sort: self.pipeline.sort,
            debug: self.pipeline.debug,
            normalize: self.pipeline.normalize,
            crop: self.pipeline.crop,
            dest_dir: self.pipeline.dest_dir,
            columns: self.report.columns,
            report_format: self.report.format,
        }
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    let config: FileConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the config file at `path`.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by `--gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# imginfo configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Command-line flags take precedence: --sort, --debug, --normalize and
# --crop switch a feature on even if it is off here; --dest-dir, --columns
# and --format replace the values below.

# ---------------------------------------------------------------------------
# Pipeline stages
# ---------------------------------------------------------------------------
[pipeline]
# Order report rows by pixel area (width * height), smallest first.
# Images with the same area keep their input order.
sort = false

# Print "path: reason" for every file that could not be decoded.
# Without this, undecodable files are dropped silently.
debug = false

# Convert every image to the canonical 32-bit RGBA format (ABGR8888).
normalize = false

# Trim fully transparent rows and columns from the image edges.
# Implies normalize. Requires dest_dir (here or via --dest-dir).
crop = false

# Export every image as PNG into this directory (created if missing).
# The file name is the source name with its last suffix replaced by .png.
# dest_dir = "out"

# ---------------------------------------------------------------------------
# Report
# ---------------------------------------------------------------------------
[report]
# Columns to print, any of:
#   w h pitch type order layout bits bytes alpha
#   rmask gmask bmask amask pixfmt name
# "name" (the source path) is always printed last.
columns = [
    "w", "h", "pitch", "type", "order", "layout", "bits", "bytes", "alpha",
    "rmask", "gmask", "bmask", "amask", "pixfmt", "name",
]

# "table" for aligned text, "json" for one object per image.
format = "table"
"##
}
