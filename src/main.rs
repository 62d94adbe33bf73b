use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use imginfo::config::{self, FileConfig};
use imginfo::imaging::{RustBackend, Session};
use imginfo::output::{self, Column, ReportFormat};
use imginfo::pipeline::{self, Options, PipelineEvent};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imginfo")]
#[command(version)]
#[command(about = "Print pixel-format details for a batch of images")]
#[command(long_about = "\
Print pixel-format details for a batch of images

Every file is decoded; files that cannot be decoded are skipped (use --debug
to see why). One report row is printed per remaining image, in input order
unless --sort is given.

Optional stages, applied per image before the report:
  --normalize   convert to the canonical 32-bit RGBA format (ABGR8888)
  --crop        trim fully transparent edges (implies --normalize)
  --dest-dir    export every image as <dest-dir>/<name>.png; an output
                path already written this run, or one that is an input file,
                is not overwritten and counts as an export failure (exit 1)

Report columns:
  w h pitch type order layout bits bytes alpha rmask gmask bmask amask pixfmt name

Run 'imginfo --gen-config' to print a documented config file.")]
struct Cli {
    /// Image files to inspect
    #[arg(value_name = "FILES", required_unless_present = "gen_config")]
    files: Vec<PathBuf>,

    /// Order the report by pixel area, smallest first
    #[arg(short, long)]
    sort: bool,

    /// Print a line for every file that fails to decode
    #[arg(short, long)]
    debug: bool,

    /// Convert every image to the canonical format
    #[arg(short, long)]
    normalize: bool,

    /// Trim transparent borders (requires --dest-dir)
    #[arg(short, long)]
    crop: bool,

    /// Export every image as <DIR>/<name>.png. Names are the input file
    /// stem, so a second input with the same stem, or an output that would
    /// replace one of the inputs, is refused as an export failure
    #[arg(short = 'o', long, value_name = "DIR")]
    dest_dir: Option<PathBuf>,

    /// Comma-separated report columns
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    columns: Option<Vec<Column>>,

    /// Report layout
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Read defaults from a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a stock config file with all options documented
    #[arg(long)]
    gen_config: bool,

    /// Log stage progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer command-line flags over the config file.
    fn into_options(self) -> Result<Options, config::ConfigError> {
        let file = match &self.config {
            Some(path) => config::load_config(path)?,
            None => FileConfig::default(),
        };
        let mut options = file.into_options(self.files);
        options.sort |= self.sort;
        options.debug |= self.debug;
        options.normalize |= self.normalize;
        options.crop |= self.crop;
        if let Some(dest_dir) = self.dest_dir {
            options.dest_dir = Some(dest_dir);
        }
        if let Some(columns) = self.columns {
            options.columns = columns;
        }
        if let Some(format) = self.format {
            options.report_format = format;
        }
        Ok(options)
    }
}

/// Logs go to stderr so they never mix with the report.
///
/// Default level is `warn`; `--verbose` raises it to `debug`. `RUST_LOG`
/// overrides both.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::LoadFailed { .. } => println!("{}", output::format_event(event)),
        PipelineEvent::ExportFailed { .. } => eprintln!("{}", output::format_event(event)),
        _ => info!("{}", output::format_event(event)),
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let options = cli.into_options()?;
    if options.crop && options.dest_dir.is_none() {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "--crop requires --dest-dir <DIR>",
            )
            .exit();
    }

    let backend = RustBackend::new();
    let session = Session::open(&backend)?;
    let summary = pipeline::run(session.backend(), &options, &mut print_event)?;
    drop(session);

    match options.report_format {
        ReportFormat::Table => output::print_report(&summary.batch, &options.columns),
        ReportFormat::Json => output::print_json(&summary.batch)?,
    }

    if summary.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            failures = summary.export_failures.len(),
            "some images could not be exported"
        );
        Ok(ExitCode::FAILURE)
    }
}
