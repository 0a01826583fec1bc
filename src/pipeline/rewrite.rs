//! AI rewrite: turn extracted text into an HTML fragment.
//!
//! The orchestrator only sees [`TextRewriter`]; the production
//! implementation, [`LlmRewriter`], wraps an `edgequake-llm` provider. One
//! request per run, no retries: a failed or timed-out call fails the run and
//! the caller decides whether to try again.

use crate::config::{RewriteConfig, DEFAULT_MODEL};
use crate::error::RewriteError;
use crate::prompts::build_rewrite_request;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of one rewrite call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewritten {
    /// Raw model output, before markup cleanup.
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Rewritten {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Something that rewrites text according to an instruction.
#[async_trait]
pub trait TextRewriter: Send + Sync {
    async fn rewrite(&self, instruction: &str, text: &str) -> Result<Rewritten, RewriteError>;
}

/// [`TextRewriter`] backed by an `edgequake-llm` provider.
pub struct LlmRewriter {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmRewriter {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }
}

/// Sampling options for the rewrite call.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl TextRewriter for LlmRewriter {
    async fn rewrite(&self, instruction: &str, text: &str) -> Result<Rewritten, RewriteError> {
        let messages = vec![ChatMessage::user(build_rewrite_request(instruction, text))];
        let options = build_options(self.temperature, self.max_tokens);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| RewriteError::AiFailed {
                message: e.to_string(),
            })?;

        Ok(Rewritten {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Run one rewrite bounded by `timeout_secs`.
///
/// Whitespace-only input never reaches the provider and yields an empty
/// result. An empty answer from the provider is an error: there would be
/// nothing to render.
pub async fn rewrite_text(
    rewriter: &dyn TextRewriter,
    instruction: &str,
    text: &str,
    timeout_secs: u64,
) -> Result<Rewritten, RewriteError> {
    if text.trim().is_empty() {
        return Ok(Rewritten::default());
    }

    let start = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        rewriter.rewrite(instruction, text),
    )
    .await
    .map_err(|_| RewriteError::AiTimeout { secs: timeout_secs })??;

    if result.content.trim().is_empty() {
        return Err(RewriteError::AiFailed {
            message: "provider returned an empty response".to_string(),
        });
    }

    debug!(
        "Rewrite: {} input tokens, {} output tokens, {:?}",
        result.input_tokens,
        result.output_tokens,
        start.elapsed()
    );
    Ok(result)
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, RewriteError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        RewriteError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the rewriter, from most-specific to least-specific:
///
/// 1. a pre-built [`TextRewriter`] (`config.rewriter`), used as-is;
/// 2. a named provider (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`], its API key read by the provider factory;
/// 3. full auto-detection via `ProviderFactory::from_env`.
///
/// Called once per [`crate::Pipeline`], so credentials are decided before
/// any run starts.
pub fn resolve_rewriter(config: &RewriteConfig) -> Result<Arc<dyn TextRewriter>, RewriteError> {
    if let Some(ref rewriter) = config.rewriter {
        return Ok(Arc::clone(rewriter));
    }

    let provider = if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        info!("Using provider {} with model {}", name, model);
        create_provider(name, model)?
    } else {
        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| RewriteError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set GEMINI_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                    Error: {}",
                    e
                ),
            })?;
        llm_provider
    };

    Ok(Arc::new(LlmRewriter::new(
        provider,
        config.temperature,
        config.max_tokens,
    )))
}
