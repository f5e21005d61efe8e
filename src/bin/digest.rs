//! CLI binary for edgequake-digest.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DigestConfig` and prints progress and the report location.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_digest::{
    digest, inspect, DigestConfig, DigestProgressCallback, FailurePolicy, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
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

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner anchored at the bottom of the
/// terminal plus one log line per unit. The number of units is unknown until
/// every PDF has been opened, so there is no bar, only a running count.
struct CliProgressCallback {
    spinner: ProgressBar,
    /// Per-unit wall-clock start times, keyed by label.
    start_times: Mutex<HashMap<String, Instant>>,
    done: AtomicUsize,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&TICKS);
        spinner.set_style(style);
        spinner.set_prefix("Preparing");
        spinner.set_message("Scanning input folder…");
        spinner.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            spinner,
            start_times: Mutex::new(HashMap::new()),
            done: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, label: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(label))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Keep very long error messages to one terminal line.
fn truncate(msg: &str, max: usize) -> String {
    if msg.chars().count() > max {
        let head: String = msg.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        msg.to_string()
    }
}

impl DigestProgressCallback for CliProgressCallback {
    fn on_output_dir_created(&self, path: &Path) {
        self.spinner.println(format!(
            "{} Created output folder: {}",
            cyan("◆"),
            path.display()
        ));
    }

    fn on_run_start(&self, total_files: usize) {
        self.spinner.set_prefix("Reading");
        self.spinner.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} files. Starting processing…"))
        ));
    }

    fn on_file_start(&self, file_name: &str, index: usize, total_files: usize) {
        self.spinner
            .set_message(format!("{file_name} ({index}/{total_files})"));
    }

    fn on_file_error(&self, file_name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.spinner.println(format!(
            "  {} {:<28}  {}",
            red("✗"),
            file_name,
            red(&truncate(error, 80)),
        ));
    }

    fn on_unit_start(&self, label: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(label.to_string(), Instant::now());
        }
        self.spinner.set_message(format!("reading {label}…"));
    }

    fn on_unit_complete(&self, label: &str, note_len: usize) {
        let secs = self.elapsed_secs(label);
        self.done.fetch_add(1, Ordering::SeqCst);
        self.spinner.println(format!(
            "  {} {:<28}  {:<8}  {}",
            green("✓"),
            label,
            dim(&format!("{note_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_unit_error(&self, label: &str, error: &str) {
        let secs = self.elapsed_secs(label);
        self.done.fetch_add(1, Ordering::SeqCst);
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.spinner.println(format!(
            "  {} {:<28}  {}  {}",
            red("✗"),
            label,
            red(&truncate(error, 80)),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_summary_start(&self, note_count: usize) {
        self.spinner.set_prefix("Summarising");
        self.spinner
            .set_message(format!("{note_count} notes → master summary"));
        self.spinner.println(format!(
            "{} {}",
            cyan("◆"),
            bold("Writing final master summary…")
        ));
    }

    fn on_report_written(&self, path: &Path, _summary_len: usize) {
        self.spinner.finish_and_clear();
        let done = self.done.load(Ordering::SeqCst);
        let errors = self.errors.load(Ordering::SeqCst);
        if errors == 0 {
            eprintln!("{} {} units analysed", green("✔"), bold(&done.to_string()));
        } else {
            eprintln!(
                "{} {} units analysed  ({} failed, see inline \"Error:\" notes)",
                cyan("⚠"),
                bold(&done.to_string()),
                red(&errors.to_string()),
            );
        }
        eprintln!(
            "{} Success! Report saved to:\n   {}",
            green("✔"),
            bold(&path.display().to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise ./data into ./Output/final_summary.md with a local Ollama
  digest

  # Other folders
  digest --input ~/scans --output-dir ~/reports --output-file week12.md

  # Four model calls in flight; notes keep file and page order
  digest -c 4

  # List what would be read (no model needed)
  digest --list-only

  # Keep going when a PDF is corrupt
  digest --on-extract-error skip

  # Use a hosted model instead
  digest --provider openai --model gpt-4.1-mini

INPUT:
  Files directly inside the input folder whose names end in .pdf, .jpg or
  .png (any case). Sub-folders are not searched. Files are processed in
  name order; each PDF page and each image becomes one note.

ENVIRONMENT VARIABLES:
  EDGEQUAKE_PROVIDER      Provider (ollama, openai, anthropic, gemini, …)
  EDGEQUAKE_LLM_PROVIDER  Provider fallback read by the library
  EDGEQUAKE_MODEL         Model ID (default: llama3.2-vision)
  OPENAI_API_KEY etc.     Credentials for hosted providers
  PDFIUM_LIB_PATH         Path to libpdfium (default: system library)
  RUST_LOG                Log filter, e.g. edgequake_digest=debug
"#;

/// Summarise a folder of PDFs and images with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "digest",
    version,
    about = "Summarise a folder of PDFs and images with a Vision LLM",
    long_about = "Send every PDF page and image in a folder to a vision-capable model, \
then ask the model for one combined summary and write it to a markdown report.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the PDFs and images.
    #[arg(short, long, env = "DIGEST_INPUT", default_value = "data")]
    input: PathBuf,

    /// Folder the report is written to (created if missing).
    #[arg(short = 'o', long, env = "DIGEST_OUTPUT_DIR", default_value = "Output")]
    output_dir: PathBuf,

    /// Report file name inside the output folder.
    #[arg(long, env = "DIGEST_OUTPUT_FILE", default_value = "final_summary.md")]
    output_file: String,

    /// Vision model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = "llama3.2-vision")]
    model: String,

    /// LLM provider: ollama, openai, anthropic, gemini, azure, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file replacing the per-image instruction.
    #[arg(long, env = "DIGEST_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// PDF rendering DPI (72–400).
    #[arg(long, env = "DIGEST_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Number of model calls in flight.
    #[arg(short, long, env = "DIGEST_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Retries per model call.
    #[arg(long, env = "DIGEST_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-call timeout in seconds (default: wait indefinitely).
    #[arg(long, env = "DIGEST_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// LLM temperature (0.0–2.0). Default: the backend's.
    #[arg(long, env = "DIGEST_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens per call. Default: the backend's.
    #[arg(long, env = "DIGEST_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// What to do with a file that cannot be read or rendered.
    #[arg(long, env = "DIGEST_ON_EXTRACT_ERROR", value_enum, default_value = "fail")]
    on_extract_error: PolicyArg,

    /// What to do when a model call fails.
    #[arg(long, env = "DIGEST_ON_MODEL_ERROR", value_enum, default_value = "skip")]
    on_model_error: PolicyArg,

    /// Path to the libpdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// List the files and page counts that would be read; no model calls.
    #[arg(long)]
    list_only: bool,

    /// Print the run result (notes, summary, stats) as JSON on stdout.
    #[arg(long, env = "DIGEST_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DIGEST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DIGEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DIGEST_QUIET")]
    quiet: bool,
}

/// `fail` aborts the run; `skip` records an inline "Error: …" note and continues.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    Fail,
    Skip,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(v: PolicyArg) -> Self {
        match v {
            PolicyArg::Fail => FailurePolicy::FailFast,
            PolicyArg::Skip => FailurePolicy::Degrade,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the spinner active, only errors are logged; the spinner lines
    // carry the per-unit feedback.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_only;
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

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn DigestProgressCallback>);

    let config = build_config(&cli, progress).await?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_only {
        let files = inspect(&config).await.context("Failed to list input files")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&files).context("Failed to serialise file list")?
            );
        } else {
            for f in &files {
                println!("{:<40} {:<5} {:>4} unit(s)", f.file_name, f.kind, f.units);
            }
            let units: usize = files.iter().map(|f| f.units).sum();
            println!("{} files, {} units", files.len(), units);
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let result = digest(&config).await;
    if let (Err(_), Some(cb)) = (&result, &cli_progress) {
        cb.spinner.finish_and_clear();
    }
    let output = result.context("Digest failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet && !show_progress {
        eprintln!(
            "Analysed {} units ({} failed) in {}ms",
            output.stats.total_units, output.stats.failed_units, output.stats.total_duration_ms
        );
        eprintln!("Report saved to: {}", output.report_path.display());
    }

    Ok(())
}

/// Map CLI args to `DigestConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DigestConfig> {
    let mut builder = DigestConfig::builder()
        .input_dir(&cli.input)
        .output_dir(&cli.output_dir)
        .output_file(cli.output_file.clone())
        .model(cli.model.clone())
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .extraction_failure(cli.on_extract_error.into())
        .model_failure(cli.on_model_error.into());

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.analysis_prompt(prompt.trim().to_string());
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
