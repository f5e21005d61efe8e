//! Configuration types for a digest run.
//!
//! All run behaviour is controlled through [`DigestConfig`], built via its
//! [`DigestConfigBuilder`]. The defaults reproduce the fixed layout the tool
//! has always used: read `data/`, write `Output/final_summary.md`, ask
//! `llama3.2-vision` on a local Ollama.

use crate::error::DigestError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default folder scanned for documents.
pub const DEFAULT_INPUT_DIR: &str = "data";
/// Default folder the report is written into.
pub const DEFAULT_OUTPUT_DIR: &str = "Output";
/// Default report file name.
pub const DEFAULT_OUTPUT_FILE: &str = "final_summary.md";
/// Default vision model identifier.
pub const DEFAULT_MODEL: &str = "llama3.2-vision";
/// Provider used when neither config nor environment names one.
pub const DEFAULT_PROVIDER: &str = "ollama";

/// Configuration for a digest run.
///
/// Built via [`DigestConfig::builder()`] or using [`DigestConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_digest::{DigestConfig, FailurePolicy};
///
/// let config = DigestConfig::builder()
///     .input_dir("scans")
///     .output_dir("reports")
///     .model("llava")
///     .extraction_failure(FailurePolicy::Degrade)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct DigestConfig {
    /// Folder scanned (non-recursively) for `.pdf`, `.jpg` and `.png` files.
    pub input_dir: PathBuf,

    /// Folder the report is written into. Created if absent.
    pub output_dir: PathBuf,

    /// Report file name inside `output_dir`. Overwritten on every run.
    pub output_file: String,

    /// Model identifier, used for both the per-unit and the aggregation call.
    pub model: String,

    /// LLM provider name (e.g. "ollama", "openai").
    /// If None, `EDGEQUAKE_LLM_PROVIDER` is consulted, then [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom per-image instruction. If None, uses
    /// [`crate::prompts::ANALYZE_IMAGE_PROMPT`].
    pub analysis_prompt: Option<String>,

    /// Sampling temperature. None leaves the backend default in place.
    pub temperature: Option<f32>,

    /// Maximum tokens generated per call. None leaves the backend default.
    pub max_tokens: Option<usize>,

    /// Rendering DPI for PDF pages. Range: 72–400. Default: 72.
    ///
    /// 72 DPI renders one pixel per PDF point, the rasteriser's native scale.
    pub dpi: u32,

    /// Cap on either dimension of a rendered page, in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// Number of per-unit model calls allowed in flight. Default: 1.
    ///
    /// Notes are always reassembled in discovery/page order, so raising this
    /// never changes the report for a deterministic model.
    pub concurrency: usize,

    /// Retry attempts on a failed model call. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. None waits indefinitely.
    pub api_timeout_secs: Option<u64>,

    /// What to do when a file cannot be read or a PDF cannot be rendered.
    /// Default: [`FailurePolicy::FailFast`].
    pub extraction_failure: FailurePolicy,

    /// What to do when a model call fails. Default: [`FailurePolicy::Degrade`].
    pub model_failure: FailurePolicy,

    /// Path to a libpdfium shared library. None binds the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Progress events for the host application.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            analysis_prompt: None,
            temperature: None,
            max_tokens: None,
            dpi: 72,
            max_rendered_pixels: 4000,
            concurrency: 1,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: None,
            extraction_failure: FailurePolicy::FailFast,
            model_failure: FailurePolicy::Degrade,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DigestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("output_file", &self.output_file)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("dpi", &self.dpi)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("extraction_failure", &self.extraction_failure)
            .field("model_failure", &self.model_failure)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .finish()
    }
}

impl DigestConfig {
    /// Create a new builder for `DigestConfig`.
    pub fn builder() -> DigestConfigBuilder {
        DigestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the report: `output_dir/output_file`.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }
}

/// Builder for [`DigestConfig`].
#[derive(Debug)]
pub struct DigestConfigBuilder {
    config: DigestConfig,
}

impl DigestConfigBuilder {
    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.input_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn output_file(mut self, name: impl Into<String>) -> Self {
        self.config.output_file = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn analysis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.analysis_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn extraction_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.extraction_failure = policy;
        self
    }

    pub fn model_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.model_failure = policy;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.pdfium_library_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DigestConfig, DigestError> {
        let c = &self.config;
        if c.output_file.trim().is_empty() {
            return Err(DigestError::InvalidConfig(
                "Output file name must not be empty".into(),
            ));
        }
        if Path::new(&c.output_file).components().count() != 1 {
            return Err(DigestError::InvalidConfig(format!(
                "Output file must be a bare file name, got '{}'",
                c.output_file
            )));
        }
        if c.model.trim().is_empty() {
            return Err(DigestError::InvalidConfig("Model must not be empty".into()));
        }
        if c.dpi < 72 || c.dpi > 400 {
            return Err(DigestError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(DigestError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a failure inside one file or one model call is treated.
///
/// | Policy | Effect |
/// |--------|--------|
/// | `FailFast` | abort the run; no report is written |
/// | `Degrade`  | record `"Error: {message}"` as the note and continue |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    FailFast,
    Degrade,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_layout() {
        let c = DigestConfig::default();
        assert_eq!(c.input_dir, PathBuf::from("data"));
        assert_eq!(c.output_dir, PathBuf::from("Output"));
        assert_eq!(c.output_file, "final_summary.md");
        assert_eq!(c.model, "llama3.2-vision");
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_retries, 0);
        assert_eq!(c.extraction_failure, FailurePolicy::FailFast);
        assert_eq!(c.model_failure, FailurePolicy::Degrade);
        assert_eq!(c.report_path(), PathBuf::from("Output").join("final_summary.md"));
    }

    #[test]
    fn builder_clamps() {
        let c = DigestConfig::builder()
            .dpi(10)
            .concurrency(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn build_rejects_nested_output_file() {
        let err = DigestConfig::builder()
            .output_file("sub/report.md")
            .build()
            .unwrap_err();
        assert!(matches!(err, DigestError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_empty_model() {
        assert!(DigestConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", DigestConfig::default());
        assert!(s.contains("llama3.2-vision"));
        assert!(!s.contains("progress_callback"));
    }
}
