//! CLI binary for edgequake-pdf-rewrite.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RewriteConfig`, runs one document, and reports the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_rewrite::{
    inspect, Pipeline, PipelineProgressCallback, ProgressCallback, RewriteConfig, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current stage, with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, input: &Path) {
        self.bar.set_message(input.display().to_string());
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.label());
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<14} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_failed(&self, stage: Stage, error: &str) {
        let first_line = error.lines().next().unwrap_or_default();
        self.bar.println(format!(
            "  {} {:<14} {}",
            red("✗"),
            stage.label(),
            red(first_line)
        ));
    }

    fn on_run_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rewrite the first two pages (writes processed_report.pdf next to the input)
  pdf-rewrite report.pdf

  # Rewrite the first page only, explicit output
  pdf-rewrite --pages 1 report.pdf -o out/report.pdf

  # Use a specific provider and model
  pdf-rewrite --provider openai --model gpt-4.1-mini report.pdf

  # Scanned document in German, Windows poppler build
  pdf-rewrite --ocr-lang deu --poppler-dir C:\poppler\Library\bin scan.pdf

  # Page count and scan verdict only (no API key needed)
  pdf-rewrite --inspect-only report.pdf

REQUIRED TOOLS:
  pdftotext, pdftoppm, pdfunite   poppler-utils
  tesseract                       OCR for scanned documents
  soffice                         LibreOffice, HTML to PDF

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  POPPLER_PATH            Directory containing the poppler binaries
  SOFFICE_PATH            LibreOffice soffice binary
  TESSERACT_PATH          Tesseract binary
  RUST_LOG                Override the log filter (e.g. edgequake_pdf_rewrite=debug)
"#;

/// Rewrite the opening pages of a PDF with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-rewrite",
    version,
    about = "Rewrite the opening pages of a PDF with an LLM and keep the rest untouched",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF file.
    input: PathBuf,

    /// Output PDF. Default: processed_<input name> next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of leading pages to rewrite.
    #[arg(long, env = "PDF_REWRITE_PAGES", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID. Default: gemini-2.0-flash when a provider is named.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Path to a text file containing a custom rewrite instruction.
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// Directory containing pdftotext, pdftoppm and pdfunite.
    #[arg(long, env = "POPPLER_PATH")]
    poppler_dir: Option<PathBuf>,

    /// LibreOffice binary used to render HTML to PDF.
    #[arg(long, env = "SOFFICE_PATH", default_value = "soffice")]
    soffice: PathBuf,

    /// Tesseract binary used for OCR.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Tesseract language code.
    #[arg(long, default_value = "eng")]
    ocr_lang: String,

    /// Rasterisation DPI for OCR (72–600).
    #[arg(long, default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    ocr_dpi: u32,

    /// Per-page OCR timeout in seconds.
    #[arg(long, default_value_t = 60)]
    ocr_timeout: u64,

    /// Minimum words on page 1 for the document to count as text.
    #[arg(long, default_value_t = 20)]
    scan_threshold: usize,

    /// AI call timeout in seconds.
    #[arg(long, env = "PDF_REWRITE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Directory for per-run scratch files. Default: system temp dir.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Print page count and scan verdict only; no rewrite.
    #[arg(long)]
    inspect_only: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports each stage; keep library INFO logs out of
    // its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress && !cli.inspect_only {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let report = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            println!("File:       {}", cli.input.display());
            println!("Pages:      {}", report.page_count);
            println!("Extraction: {}", report.verdict.method());
            println!(
                "Rewrite:    first {} page(s){}",
                report.pages_to_process.min(report.page_count),
                if report.has_tail { ", rest kept" } else { "" }
            );
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let pipeline = Pipeline::new(config).context("Failed to initialise pipeline")?;
    let report = pipeline
        .run(&cli.input, &output)
        .await
        .with_context(|| format!("Processing '{}' failed", cli.input.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} page(s) rewritten via {}, {} kept  {}ms  →  {}",
            green("✔"),
            report.pages_rewritten,
            report.verdict.method(),
            report.tail_pages,
            report.total_duration_ms,
            bold(&output.display().to_string()),
        );
        if report.input_tokens + report.output_tokens > 0 {
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&report.input_tokens.to_string()),
                dim(&report.output_tokens.to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `RewriteConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RewriteConfig> {
    let mut builder = RewriteConfig::builder()
        .pages_to_process(cli.pages as usize)
        .scan_min_words(cli.scan_threshold)
        .ocr_language(cli.ocr_lang.clone())
        .ocr_dpi(cli.ocr_dpi)
        .ocr_timeout_secs(cli.ocr_timeout)
        .api_timeout_secs(cli.api_timeout)
        .soffice(cli.soffice.clone())
        .tesseract(cli.tesseract.clone());

    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read rewrite prompt from {:?}", path))?;
        builder = builder.rewrite_prompt(prompt);
    }
    if let Some(ref dir) = cli.poppler_dir {
        builder = builder.poppler_dir(dir.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `processed_<name>` in the input's directory.
fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());
    input.with_file_name(format!("processed_{name}"))
}
