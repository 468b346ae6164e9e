//! xlsnap CLI - render worksheets of an XLSX file to PNG
//!
//! Usage:
//!   xlsnap_cli -i book.xlsx                      # first sheet into ./
//!   xlsnap_cli -i book.xlsx --sheet Data -o a.png
//!   xlsnap_cli -i book.xlsx --all -o out/ --manifest out/manifest.json

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Serialize;
use xlsnap::batch::output_file_name;
use xlsnap::{
    render_workbook, FontRegistry, RenderOptions, Renderer, SheetSelection, XlsxWorkbook,
};

#[derive(Parser)]
#[command(name = "xlsnap_cli")]
#[command(author, version, about = "Render XLSX worksheets to PNG images")]
struct Cli {
    /// Input workbook (.xlsx)
    #[arg(short, long)]
    input: PathBuf,

    /// Output .png file (single sheet) or directory (default: current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sheet to render by name
    #[arg(long, conflicts_with_all = ["index", "all"])]
    sheet: Option<String>,

    /// Sheet to render by 0-based position (default: 0)
    #[arg(long, conflicts_with = "all")]
    index: Option<usize>,

    /// Render every sheet
    #[arg(long)]
    all: bool,

    /// Supersampling factor
    #[arg(long)]
    scale: Option<f64>,

    /// Largest rows x cols accepted per sheet; 0 disables the check
    #[arg(long)]
    max_cells: Option<u64>,

    /// Extra font directory, searched before the system fonts (repeatable)
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,

    /// JSON render options file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON summary of outputs and failures here
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error | Level::Warn | Level::Info => {
                eprintln!("[{}] {}", record.level(), record.args());
            }
            Level::Debug | Level::Trace => {
                eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
    }
}

#[derive(Serialize)]
struct ManifestOutput {
    sheet: String,
    index: usize,
    path: PathBuf,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct ManifestFailure {
    sheet: String,
    error: String,
}

#[derive(Serialize)]
struct Manifest {
    input: PathBuf,
    outputs: Vec<ManifestOutput>,
    failures: Vec<ManifestFailure>,
}

fn selection(cli: &Cli) -> SheetSelection {
    if cli.all {
        SheetSelection::All
    } else if let Some(name) = &cli.sheet {
        SheetSelection::Name(name.clone())
    } else {
        SheetSelection::Index(cli.index.unwrap_or(0))
    }
}

fn render_options(cli: &Cli) -> Result<RenderOptions> {
    let mut options = match &cli.config {
        Some(path) => RenderOptions::from_json_file(path)
            .with_context(|| format!("Failed to read options from '{}'", path.display()))?,
        None => RenderOptions::default(),
    };
    if let Some(scale) = cli.scale {
        options.scale = scale;
    }
    if let Some(max_cells) = cli.max_cells {
        options.max_cells = (max_cells > 0).then_some(max_cells);
    }
    Ok(options)
}

fn is_png_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

fn run(cli: &Cli) -> Result<bool> {
    let options = render_options(cli)?;
    let fonts = cli
        .font_dirs
        .iter()
        .fold(FontRegistry::builder(), |b, dir| b.add_dir(dir))
        .add_system_dirs()
        .build();
    if fonts.is_empty() {
        log::warn!("no fonts found; pass --font-dir to draw cell text");
    }
    let renderer = Renderer::builder()
        .with_options(options)
        .with_fonts(Arc::new(fonts))
        .build()
        .context("Invalid render options")?;

    let workbook = XlsxWorkbook::open(&cli.input)
        .with_context(|| format!("Failed to open '{}'", cli.input.display()))?;

    let selection = selection(cli);
    let single_file = match &cli.output {
        Some(path) if is_png_path(path) => {
            if selection == SheetSelection::All {
                bail!("--all writes one file per sheet; give -o a directory");
            }
            Some(path.clone())
        }
        _ => None,
    };
    let out_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    if single_file.is_none() {
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create '{}'", out_dir.display()))?;
    }

    let report = render_workbook(&workbook, &selection, &renderer, &renderer.load_options());
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    let mut manifest = Manifest {
        input: cli.input.clone(),
        outputs: Vec::new(),
        failures: report
            .failures
            .iter()
            .map(|f| ManifestFailure {
                sheet: f.name.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    };

    for sheet in &report.rendered {
        let path = single_file
            .clone()
            .unwrap_or_else(|| out_dir.join(output_file_name(&cli.input, &sheet.name, &timestamp)));
        match sheet.image.save_png(&path) {
            Ok(()) => {
                log::info!("wrote {}", path.display());
                manifest.outputs.push(ManifestOutput {
                    sheet: sheet.name.clone(),
                    index: sheet.index,
                    path,
                    width: sheet.image.width(),
                    height: sheet.image.height(),
                });
            }
            Err(e) => {
                log::error!("sheet {:?}: cannot write {}: {e}", sheet.name, path.display());
                manifest.failures.push(ManifestFailure {
                    sheet: sheet.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    for failure in &manifest.failures {
        log::error!("sheet {:?}: {}", failure.sheet, failure.error);
    }

    if let Some(path) = &cli.manifest {
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write manifest '{}'", path.display()))?;
    }

    Ok(manifest.failures.is_empty())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
