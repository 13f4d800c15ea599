use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xlate_core::{HttpTranslator, RunConfig, TranslateOptions};

mod formatter;

const ENDPOINT_ENV: &str = "XLATE_ENDPOINT";
const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xltx", "xltm"];

#[derive(Parser)]
#[command(name = "xlate")]
#[command(about = "Translate spreadsheet text cells, preserving everything else byte-for-byte", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the workbook to translate
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Target language code (e.g. "es")
    #[arg(short, long, value_name = "LANG")]
    target_lang: Option<String>,

    /// Source language code; omit to let the provider detect it
    #[arg(short, long, value_name = "LANG")]
    source_lang: Option<String>,

    /// Output path (defaults to <input>_translated.<ext>)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Only process this sheet (repeatable)
    #[arg(long = "sheet", value_name = "NAME")]
    sheets: Vec<String>,

    /// Domain hint forwarded to the translation provider
    #[arg(long, value_name = "TEXT")]
    context: Option<String>,

    /// Texts per provider request
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Translation endpoint URL (overrides XLATE_ENDPOINT and config)
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// List translatable cells without calling the provider
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        RunConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("xlate.toml");
        if default_config_path.exists() {
            RunConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            RunConfig::default()
        }
    };

    let sheets: Option<HashSet<String>> = if cli.sheets.is_empty() {
        None
    } else {
        Some(cli.sheets.iter().cloned().collect())
    };

    if cli.dry_run {
        let (cells, faults) = xlate_core::extract_candidates(&cli.file, sheets.as_ref())
            .with_context(|| format!("Failed to scan file: {}", cli.file.display()))?;
        match cli.format {
            OutputFormat::Human => formatter::print_candidates(&cli.file, &cells, &faults),
            OutputFormat::Json => formatter::print_candidates_json(&cli.file, &cells, &faults)?,
        }
        std::process::exit(if faults.is_empty() { 0 } else { 1 });
    }

    let Some(target_lang) = cli.target_lang.as_deref() else {
        bail!("--target-lang is required unless --dry-run is given");
    };

    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| std::env::var(ENDPOINT_ENV).ok())
        .or_else(|| config.endpoint.clone());
    let Some(endpoint) = endpoint else {
        bail!(
            "No translation endpoint configured (use --endpoint, {ENDPOINT_ENV}, or the config file)"
        );
    };

    let translator = HttpTranslator::new(&endpoint, Duration::from_secs(config.timeout_secs))
        .context("Failed to build translation client")?;

    let mut options = TranslateOptions::new(target_lang);
    options.source_lang = cli.source_lang.clone();
    options.context = cli.context.clone();
    options.sheets = sheets;
    options.batch_size = cli.batch_size.unwrap_or(config.batch_size);
    options.max_cells = config.max_cells;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.file));

    let report = xlate_core::translate_workbook(&cli.file, &output, &translator, &options)
        .with_context(|| format!("Failed to translate file: {}", cli.file.display()))?;

    match cli.format {
        OutputFormat::Human => formatter::print_report(&cli.file, &output, &report),
        OutputFormat::Json => formatter::print_report_json(&cli.file, &output, &report)?,
    }

    std::process::exit(if report.faults.is_empty() { 0 } else { 1 });
}

/// `book.xlsx` becomes `book_translated.xlsx`; unknown extensions are
/// coerced to `.xlsx` so the output always opens as a workbook.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| WORKBOOK_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| "xlsx".to_string());
    input.with_file_name(format!("{stem}_translated.{extension}"))
}
