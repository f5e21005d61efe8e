//! Run entry points: discover → extract → analyze → aggregate → report.
//!
//! [`digest`] wires the production collaborators (pdfium, an
//! `edgequake-llm` provider) into [`digest_with`], which drives the stages
//! against any [`ImageAnalyzer`] / [`PageRenderer`] pair.
//!
//! ## Ordering
//!
//! Every raster unit gets a slot index when it leaves extraction, and its
//! note is stored at that index. The order of notes in the summary prompt is
//! therefore discovery order, then page order, whatever `concurrency` is and
//! whichever model call returns first.

use crate::config::{DigestConfig, FailurePolicy, DEFAULT_PROVIDER};
use crate::error::{DigestError, UnitError};
use crate::output::{DigestOutput, DigestStats, InspectedFile, Note, UnitLabel};
use crate::pipeline::aggregate::summarize_notes;
use crate::pipeline::analyze::{analyze_unit, ImageAnalyzer, LlmAnalyzer};
use crate::pipeline::discover::{self, SourceFile};
use crate::pipeline::extract::{count_units, extract_units, PageRenderer, PdfiumRenderer, RasterUnit};
use crate::pipeline::report::{render_report, write_report};
use crate::prompts::error_placeholder;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Summarise every document in `config.input_dir` into `config.report_path()`.
///
/// This is the primary entry point for the library. The folder checks run
/// before the provider is resolved, so an empty or missing input folder is
/// reported as such even when no model backend is configured.
///
/// # Errors
/// Returns `Err(DigestError)` for fatal errors only; nothing is written:
/// - input folder missing, or no eligible files in it
/// - a file could not be extracted while `extraction_failure` is `FailFast`
/// - a model call failed while `model_failure` is `FailFast`
/// - the provider or pdfium could not be initialised
pub async fn digest(config: &DigestConfig) -> Result<DigestOutput, DigestError> {
    let total_start = Instant::now();
    let files = prepare_run(config).await?;

    let provider = resolve_provider(config)?;
    let analyzer: Arc<dyn ImageAnalyzer> = Arc::new(LlmAnalyzer::new(provider, config));
    let renderer: Arc<dyn PageRenderer> = Arc::new(PdfiumRenderer::from_config(config));

    run_files(config, &files, analyzer, renderer, total_start).await
}

/// Run the pipeline against the given collaborators.
pub async fn digest_with(
    config: &DigestConfig,
    analyzer: Arc<dyn ImageAnalyzer>,
    renderer: Arc<dyn PageRenderer>,
) -> Result<DigestOutput, DigestError> {
    let total_start = Instant::now();
    let files = prepare_run(config).await?;
    run_files(config, &files, analyzer, renderer, total_start).await
}

/// Check the input folder, create the output folder, list the files.
async fn prepare_run(config: &DigestConfig) -> Result<Vec<SourceFile>, DigestError> {
    info!("Starting digest of {}", config.input_dir.display());

    // ── Step 1: Discovery ────────────────────────────────────────────────
    discover::ensure_input_dir(&config.input_dir).await?;
    if discover::ensure_output_dir(&config.output_dir).await? {
        if let Some(ref cb) = config.progress_callback {
            cb.on_output_dir_created(&config.output_dir);
        }
    }
    let files = discover::discover_files(&config.input_dir).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(files.len());
    }
    Ok(files)
}

/// Extract, analyse, aggregate and write the report for discovered `files`.
async fn run_files(
    config: &DigestConfig,
    files: &[SourceFile],
    analyzer: Arc<dyn ImageAnalyzer>,
    renderer: Arc<dyn PageRenderer>,
    total_start: Instant,
) -> Result<DigestOutput, DigestError> {
    // ── Step 2: Extraction + per-unit analysis ───────────────────────────
    let analysis_start = Instant::now();
    let notes = collect_notes(files, analyzer.as_ref(), &renderer, config).await?;
    let analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;
    info!(
        "Collected {} notes in {}ms",
        notes.len(),
        analysis_duration_ms
    );

    // ── Step 3: Aggregation ──────────────────────────────────────────────
    let summary_start = Instant::now();
    let summary = summarize_notes(analyzer.as_ref(), &notes, config).await?;
    let summary_duration_ms = summary_start.elapsed().as_millis() as u64;

    // ── Step 4: Report ───────────────────────────────────────────────────
    let report_path = config.report_path();
    let report = render_report(&summary.text);
    write_report(&report_path, &report).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_report_written(&report_path, summary.text.len());
    }

    let skipped_files = notes
        .iter()
        .filter(|n| matches!(n.error, Some(UnitError::ExtractionFailed { .. })))
        .count();
    let failed_units = notes
        .iter()
        .filter(|n| matches!(n.error, Some(UnitError::ModelFailed { .. })))
        .count();

    let stats = DigestStats {
        total_files: files.len(),
        skipped_files,
        total_units: notes.len() - skipped_files,
        failed_units,
        summary_failed: summary.failed,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        analysis_duration_ms,
        summary_duration_ms,
    };

    info!(
        "Digest complete: {} files, {} units ({} failed), {}ms total",
        stats.total_files, stats.total_units, stats.failed_units, stats.total_duration_ms
    );

    Ok(DigestOutput {
        report_path,
        report,
        summary: summary.text,
        notes,
        stats,
    })
}

/// Synchronous wrapper around [`digest`].
///
/// Creates a temporary tokio runtime internally.
pub fn digest_sync(config: &DigestConfig) -> Result<DigestOutput, DigestError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DigestError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(digest(config))
}

/// List the files a run would read, with their unit counts.
///
/// Does not require an LLM provider and never touches the output folder.
pub async fn inspect(config: &DigestConfig) -> Result<Vec<InspectedFile>, DigestError> {
    let renderer: Arc<dyn PageRenderer> = Arc::new(PdfiumRenderer::from_config(config));
    inspect_with(config, renderer).await
}

/// [`inspect`] against a given renderer.
pub async fn inspect_with(
    config: &DigestConfig,
    renderer: Arc<dyn PageRenderer>,
) -> Result<Vec<InspectedFile>, DigestError> {
    discover::ensure_input_dir(&config.input_dir).await?;
    let files = discover::discover_files(&config.input_dir).await?;

    let mut listed = Vec::with_capacity(files.len());
    for file in files {
        let units = count_units(&file, &renderer).await?;
        listed.push(InspectedFile {
            kind: file.kind.as_str().to_string(),
            file_name: file.file_name,
            path: file.path,
            units,
        });
    }
    Ok(listed)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// A unit of work leaving extraction: either an image to analyse, or the
/// placeholder note of a file that failed extraction under `Degrade`.
enum Work {
    Analyze(RasterUnit),
    Ready(Note),
}

/// Extract every file in order and analyse its units, `concurrency` at a time.
///
/// Extraction is lazy: a file is only opened once the stream needs its units,
/// so with `concurrency = 1` the run is strictly file-by-file, page-by-page.
async fn collect_notes(
    files: &[SourceFile],
    analyzer: &dyn ImageAnalyzer,
    renderer: &Arc<dyn PageRenderer>,
    config: &DigestConfig,
) -> Result<Vec<Note>, DigestError> {
    let total_files = files.len();

    let work = stream::iter(files.iter().enumerate())
        .then(move |(idx, file)| extract_file(file, idx + 1, total_files, renderer, config))
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<Work, DigestError>)))
        .try_flatten()
        .enumerate()
        .map(move |(slot, item)| async move {
            let note = match item? {
                Work::Analyze(unit) => analyze_unit(analyzer, &unit, config).await?,
                Work::Ready(note) => note,
            };
            Ok::<_, DigestError>((slot, note))
        })
        .buffer_unordered(config.concurrency.max(1));
    let mut work = std::pin::pin!(work);

    let mut slots: Vec<Option<Note>> = Vec::new();
    while let Some(result) = work.next().await {
        let (slot, note) = result?;
        debug!("Slot {} filled by {}", slot, note.label);
        if slots.len() <= slot {
            slots.resize(slot + 1, None);
        }
        slots[slot] = Some(note);
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Extract one file, applying the extraction failure policy.
async fn extract_file(
    file: &SourceFile,
    index: usize,
    total_files: usize,
    renderer: &Arc<dyn PageRenderer>,
    config: &DigestConfig,
) -> Result<Vec<Work>, DigestError> {
    info!("Processing {} ({}/{})", file.file_name, index, total_files);
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(&file.file_name, index, total_files);
    }

    match extract_units(file, renderer).await {
        Ok(units) => Ok(units.into_iter().map(Work::Analyze).collect()),
        // A missing pdfium library fails every PDF the same way.
        Err(e @ DigestError::PdfiumBindingFailed(_)) => Err(e),
        Err(e) if config.extraction_failure == FailurePolicy::Degrade => {
            let detail = e.to_string();
            warn!("Skipping {}: {}", file.file_name, detail);
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(&file.file_name, &detail);
            }
            Ok(vec![Work::Ready(Note {
                label: UnitLabel::file(&file.file_name),
                text: error_placeholder(&detail),
                error: Some(UnitError::ExtractionFailed {
                    file: file.file_name.clone(),
                    detail,
                }),
            })])
        }
        Err(e) => Err(e),
    }
}

/// Instantiate a named provider with the configured model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DigestError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DigestError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **`EDGEQUAKE_LLM_PROVIDER`** from the environment, with `config.model`.
/// 4. **[`DEFAULT_PROVIDER`]** (a local Ollama), with `config.model`.
fn resolve_provider(config: &DigestConfig) -> Result<Arc<dyn LLMProvider>, DigestError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, &config.model);
    }

    if let Ok(name) = std::env::var("EDGEQUAKE_LLM_PROVIDER") {
        if !name.is_empty() {
            return create_provider(&name, &config.model);
        }
    }

    create_provider(DEFAULT_PROVIDER, &config.model)
}
