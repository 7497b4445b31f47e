//! CLI binary for scan2data.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ExtractionConfig` + `ProviderCredentials`, runs the
//! extraction and writes the export.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2data::convert::{pdf_path_for, word_file_to_pdf};
use scan2data::{
    export_to_file, extract_files, ExportFormat, ExtractionConfig, ExtractionMode,
    ExtractionProgressCallback, ProgressCallback, Provider, ProviderCredentials,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a bar plus one log line per finished page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn page_elapsed(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar
            .set_message(format!("processing page {page_num} of {total_pages}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, raw_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{raw_len:>5} chars")),
            dim(&format!("{:.1}s", self.page_elapsed())),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
            dim(&format!("{:.1}s", self.page_elapsed())),
        ));
        self.bar.finish_and_clear();
    }

    fn on_run_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} page(s) extracted",
            green("✔"),
            bold(&total_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Mark sheet photo → spreadsheet (extracted-data.xlsx)
  scan2data marksheet.jpg

  # Several pages merged into one CSV
  scan2data page1.jpg page2.jpg page3.jpg -f csv -o results.csv

  # Handwritten letter → plain text (extracted-text.txt)
  scan2data --mode notes letter.jpg

  # Scanned PDF → Word document via Groq
  scan2data --provider groq --mode notes -f docx scan.pdf

  # Notes → PDF
  scan2data --mode notes -f pdf memo.jpg

  # Word document → text-only PDF (report.pdf, no API key needed)
  scan2data --word-to-pdf report.docx

  # Merged record as JSON on stdout
  scan2data --json invoice.png

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (provider gemini)
  GROQ_API_KEY            Groq API key (provider groq)
  SCAN2DATA_PROVIDER      Default provider (gemini, groq)
  SCAN2DATA_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium (PDF input only)
  RUST_LOG                Log filter, e.g. scan2data=debug

  Variables may also be set in a .env file in the working directory.
"#;

/// Extract structured data from document photos and scans using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "scan2data",
    version,
    about = "Extract structured data from document photos and scans using Vision LLMs",
    long_about = "Send each page image (or each page of a PDF) to a hosted Vision Language \
Model, merge the per-page results into one document, and export it as a spreadsheet, Word \
document, CSV, plain text or PDF. Supports Gemini and Groq. With --word-to-pdf, converts \
a .docx file to a text-only PDF instead.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image or PDF files, in page order (one .docx with --word-to-pdf).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the export to this file (default: extracted-data.<ext> / extracted-text.txt).
    #[arg(short, long, env = "SCAN2DATA_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision provider: gemini or groq.
    #[arg(long, env = "SCAN2DATA_PROVIDER", default_value = "gemini")]
    provider: Provider,

    /// API key. Defaults to GEMINI_API_KEY or GROQ_API_KEY depending on provider.
    #[arg(long, hide_env_values = true)]
    api_key: Option<String>,

    /// Extraction mode.
    #[arg(short, long, env = "SCAN2DATA_MODE", value_enum, default_value = "tabular")]
    mode: ModeArg,

    /// Export format. Default: xlsx for tabular, txt for notes.
    #[arg(short, long, env = "SCAN2DATA_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Model ID (e.g. gemini-2.0-flash).
    #[arg(long, env = "SCAN2DATA_MODEL")]
    model: Option<String>,

    /// Max model output tokens per page.
    #[arg(long, env = "SCAN2DATA_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: u32,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "SCAN2DATA_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Per-page API call timeout in seconds.
    #[arg(long, env = "SCAN2DATA_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Pixel width for rasterised PDF pages.
    #[arg(long, env = "SCAN2DATA_RENDER_WIDTH", default_value_t = 1600)]
    render_width: u32,

    /// Path to a text file containing a custom prompt.
    #[arg(long, env = "SCAN2DATA_PROMPT")]
    prompt_file: Option<PathBuf>,

    /// Override the Groq endpoint root.
    #[arg(long, env = "SCAN2DATA_GROQ_BASE_URL")]
    groq_base_url: Option<String>,

    /// Override the Gemini endpoint root.
    #[arg(long, env = "SCAN2DATA_GEMINI_BASE_URL")]
    gemini_base_url: Option<String>,

    /// Print the merged record as JSON on stdout instead of writing a file.
    #[arg(long)]
    json: bool,

    /// Convert a single .docx input to a text-only PDF; no model call is made.
    #[arg(long, conflicts_with = "json")]
    word_to_pdf: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCAN2DATA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Tabular,
    Notes,
}

impl From<ModeArg> for ExtractionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Tabular => ExtractionMode::Tabular,
            ModeArg::Notes => ExtractionMode::Notes,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Xlsx,
    Docx,
    Csv,
    Txt,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Xlsx => ExportFormat::Spreadsheet,
            FormatArg::Docx => ExportFormat::Word,
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Txt => ExportFormat::PlainText,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    if cli.word_to_pdf {
        return convert_word(&cli).await;
    }

    // ── Resolve mode, format and credentials ─────────────────────────────
    let mode = ExtractionMode::from(cli.mode);
    let format = cli.format.map(ExportFormat::from).unwrap_or(match mode {
        ExtractionMode::Tabular => ExportFormat::Spreadsheet,
        ExtractionMode::Notes => ExportFormat::PlainText,
    });
    if !cli.json && !format.supports(mode) {
        anyhow::bail!("{format} export is not available in {mode} mode");
    }

    let credentials = resolve_credentials(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, mode, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract_files(&cli.inputs, &credentials, &config)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json =
            serde_json::to_string_pretty(&output.record).context("Failed to serialise record")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
        return Ok(());
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format.default_filename(mode)));
    let written = export_to_file(&output.record, format, &output_path)
        .await
        .context("Export failed")?;

    if !cli.quiet {
        eprintln!(
            "{}  {} page(s)  {}ms  →  {}  {}",
            cyan("◆"),
            output.stats.total_pages,
            output.stats.total_duration_ms,
            bold(&output_path.display().to_string()),
            dim(&format!("({} bytes, {})", written, format.mime_type())),
        );
    }

    Ok(())
}

/// `--word-to-pdf`: one .docx in, one PDF out.
async fn convert_word(cli: &Cli) -> Result<()> {
    let [input] = cli.inputs.as_slice() else {
        anyhow::bail!("--word-to-pdf takes exactly one .docx input");
    };
    let output_path = cli.output.clone().unwrap_or_else(|| pdf_path_for(input));
    let written = word_file_to_pdf(input, &output_path)
        .await
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    if !cli.quiet {
        eprintln!(
            "{}  {}  →  {}  {}",
            cyan("◆"),
            input.display(),
            bold(&output_path.display().to_string()),
            dim(&format!("({written} bytes, application/pdf)")),
        );
    }
    Ok(())
}

/// `--api-key`, else the provider's key variable.
fn resolve_credentials(cli: &Cli) -> Result<ProviderCredentials> {
    let key = match cli.api_key.clone() {
        Some(key) => key,
        None => std::env::var(cli.provider.api_key_env()).with_context(|| {
            format!(
                "No API key for {}: pass --api-key or set {}",
                cli.provider,
                cli.provider.api_key_env()
            )
        })?,
    };
    if key.trim().is_empty() {
        anyhow::bail!("API key for {} is empty", cli.provider);
    }
    Ok(ProviderCredentials::new(cli.provider, key.trim()))
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(
    cli: &Cli,
    mode: ExtractionMode,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .mode(mode)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .render_width(cli.render_width);

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref url) = cli.groq_base_url {
        builder = builder.groq_base_url(url.clone());
    }
    if let Some(ref url) = cli.gemini_base_url {
        builder = builder.gemini_base_url(url.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
