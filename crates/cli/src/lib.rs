use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use overlay_core::{AnnotationStore, OverlayConfig};
use pdf_engine::{default_engine, export_pdf, suggested_file_name, OpenSource, PdfEngine};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "overlay-cli")]
#[command(about = "Bake comment, signature and stamp overlays into PDF files")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF page geometry.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Check annotation descriptors against a PDF and print them normalized.
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// JSON array of annotation descriptors.
        #[arg(long, value_name = "JSON")]
        annotations: PathBuf,
        /// Overlay configuration (JSON); environment overrides apply otherwise.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Write a copy of the PDF with the annotations drawn into it.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// JSON array of annotation descriptors.
        #[arg(long, value_name = "JSON")]
        annotations: PathBuf,
        /// Defaults to `annotated_<name>` next to the input.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Overlay configuration (JSON); environment overrides apply otherwise.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    page: u32,
    width: f32,
    height: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Validate { file, annotations, config } => {
            run_validate(&file, &annotations, config.as_deref())
        }
        Commands::Export { file, annotations, output, config } => {
            run_export(&file, &annotations, output.as_deref(), config.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_file_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let pages = (1..=page_count)
        .map(|page| {
            let size = engine.page_size(handle, page)?;
            Ok(PageSizeOutput { page, width: size.width_pt, height: size.height_pt })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload = InfoOutput { path: file.display().to_string(), page_count, pages };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    engine.close(handle)?;

    Ok(())
}

fn run_validate(file: &Path, annotations: &Path, config: Option<&Path>) -> Result<()> {
    let store = load_store(file, annotations, load_config(config)?)?;
    println!("{}", store.to_json()?);
    Ok(())
}

fn run_export(
    file: &Path,
    annotations: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let store = load_store(file, annotations, load_config(config)?)?;
    let page_count = store.page_count().unwrap_or(0);

    let source = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let (bytes, report) =
        export_pdf(&source, &store, page_count, store.config()).context("export failed")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_export_output(file));
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, bytes)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;

    tracing::info!(
        pages = report.pages,
        drawn = report.drawn,
        skipped = report.skipped.len(),
        "export finished"
    );
    for skipped in &report.skipped {
        eprintln!("skipped annotation {} on page {}: {}", skipped.id, skipped.page, skipped.reason);
    }
    println!("{}", output.display());

    Ok(())
}

/// `--config` file when given, otherwise defaults with environment overrides
fn load_config(path: Option<&Path>) -> Result<OverlayConfig> {
    match path {
        Some(path) => OverlayConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => OverlayConfig::from_env().context("invalid overlay environment"),
    }
}

/// Build a store from descriptor JSON, validated against the PDF's page count
fn load_store(file: &Path, annotations: &Path, config: OverlayConfig) -> Result<AnnotationStore> {
    ensure_file_exists(file)?;
    ensure_file_exists(annotations)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;
    let page_count = engine.page_count(handle)?;
    engine.close(handle)?;

    let json = fs::read_to_string(annotations)
        .with_context(|| format!("failed to read {}", annotations.display()))?;
    let mut store = AnnotationStore::with_config(config);
    store.set_page_count(page_count);
    store.extend_from_json(&json).context("invalid annotations")?;

    Ok(store)
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_export_output(file: &Path) -> PathBuf {
    let name = file.file_name().and_then(|name| name.to_str()).unwrap_or("document.pdf");

    file.with_file_name(suggested_file_name(name))
}
