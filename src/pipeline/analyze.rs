//! Model interaction: the [`ImageAnalyzer`] seam and the per-unit call.
//!
//! [`ImageAnalyzer`] is the whole contract the pipeline has with the model
//! backend: one method for "image in, text out" and one for "notes in,
//! summary out". [`LlmAnalyzer`] implements it over any `edgequake-llm`
//! provider; tests substitute deterministic stubs.
//!
//! ## Retry Strategy
//!
//! Off by default (`max_retries = 0`). When enabled, the delay doubles after
//! each attempt starting at `retry_backoff_ms`: 500 ms → 1 s → 2 s.

use crate::config::{DigestConfig, FailurePolicy};
use crate::error::{DigestError, ModelError, UnitError};
use crate::output::Note;
use crate::pipeline::encode::to_image_data;
use crate::pipeline::extract::RasterUnit;
use crate::prompts::{error_placeholder, summary_prompt, ANALYZE_IMAGE_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// The vision/language model collaborator.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Describe one raster unit. `unit.label` names it for logging.
    async fn analyze(&self, unit: &RasterUnit) -> Result<String, ModelError>;

    /// Summarise the newline-joined, header-tagged notes of a whole run.
    async fn summarize(&self, notes: &str) -> Result<String, ModelError>;
}

/// [`ImageAnalyzer`] backed by an `edgequake-llm` provider.
///
/// Each unit is sent as a single user message carrying the instruction text
/// and the image attachment; the summary is a single text-only user message.
pub struct LlmAnalyzer {
    provider: Arc<dyn LLMProvider>,
    instruction: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl LlmAnalyzer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &DigestConfig) -> Self {
        Self {
            provider,
            instruction: config
                .analysis_prompt
                .clone()
                .unwrap_or_else(|| ANALYZE_IMAGE_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ModelError> {
        let options = self.options();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::Backend(e.to_string()))?;
        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

#[async_trait]
impl ImageAnalyzer for LlmAnalyzer {
    async fn analyze(&self, unit: &RasterUnit) -> Result<String, ModelError> {
        let message =
            ChatMessage::user_with_images(self.instruction.as_str(), vec![to_image_data(unit)]);
        self.chat(vec![message]).await
    }

    async fn summarize(&self, notes: &str) -> Result<String, ModelError> {
        self.chat(vec![ChatMessage::user(summary_prompt(notes))]).await
    }
}

/// Delay before retry `attempt` (1-based): `base_ms * 2^(attempt - 1)`,
/// saturating at `u64::MAX`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Run `call` under the configured timeout, retrying with backoff.
///
/// Returns the last error and the number of retries spent when every
/// attempt failed.
pub(crate) async fn call_with_retry<F, Fut>(
    label: &str,
    config: &DigestConfig,
    call: F,
) -> Result<String, (ModelError, u32)>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, ModelError>>,
{
    let mut last_err = ModelError::Backend("no attempt made".into());

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                label, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let result = match config.api_timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), call())
                .await
                .unwrap_or(Err(ModelError::Timeout { secs })),
            None => call().await,
        };

        match result {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!("{}: attempt {} failed — {}", label, attempt + 1, e);
                last_err = e;
            }
        }
    }

    Err((last_err, config.max_retries))
}

/// Analyse one unit and turn the outcome into a [`Note`].
///
/// Under [`FailurePolicy::Degrade`] a failed call becomes a note whose text
/// is `"Error: {message}"`; under [`FailurePolicy::FailFast`] it aborts the
/// run with [`DigestError::ModelFailed`].
pub async fn analyze_unit(
    analyzer: &dyn ImageAnalyzer,
    unit: &RasterUnit,
    config: &DigestConfig,
) -> Result<Note, DigestError> {
    let label = unit.label.to_string();
    info!("Reading: {}", label);
    if let Some(ref cb) = config.progress_callback {
        cb.on_unit_start(&label);
    }

    let start = Instant::now();
    let outcome = call_with_retry(&label, config, || analyzer.analyze(unit)).await;
    debug!("{}: model call took {:?}", label, start.elapsed());

    match outcome {
        Ok(text) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_unit_complete(&label, text.len());
            }
            Ok(Note {
                label: unit.label.clone(),
                text,
                error: None,
            })
        }
        Err((err, retries)) => {
            let message = err.to_string();
            if config.model_failure == FailurePolicy::FailFast {
                return Err(DigestError::ModelFailed { label, message });
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_unit_error(&label, &message);
            }
            Ok(Note {
                label: unit.label.clone(),
                text: error_placeholder(&message),
                error: Some(UnitError::ModelFailed {
                    label,
                    retries,
                    detail: message,
                }),
            })
        }
    }
}
