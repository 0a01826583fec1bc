//! Orchestration: drive one input PDF through every stage to the output.
//!
//! ```text
//! count ─▶ classify+extract ─▶ AI rewrite ─▶ render ─▶ [splice tail] ─▶ merge
//! ```
//!
//! Each stage runs exactly once; the first failure aborts the rest. The
//! run's scratch directory is cleaned up before [`Pipeline::run`] returns,
//! whether it succeeded or not, and the output path is only ever written by
//! the final publish step.

use crate::artifacts::RunArtifacts;
use crate::config::RewriteConfig;
use crate::error::RewriteError;
use crate::output::{InspectReport, RunReport, StageTiming};
use crate::pipeline::classify::{classify_document, Verdict};
use crate::pipeline::rewrite::{resolve_rewriter, rewrite_text, TextRewriter};
use crate::pipeline::tools::{SystemToolchain, Toolchain};
use crate::pipeline::{document, extract, input, merge, postprocess, render};
use crate::progress::{NoopProgressCallback, PipelineProgressCallback};
use crate::prompts::REWRITE_PROMPT;
use crate::stage::Stage;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A configured page-rewrite pipeline.
///
/// Collaborators are resolved once in [`Pipeline::new`]. The pipeline is
/// cheap to clone and can serve concurrent runs: every run gets its own
/// scratch directory.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<RewriteConfig>,
    tools: Arc<dyn Toolchain>,
    rewriter: Arc<dyn TextRewriter>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Resolve the toolchain and the AI provider for `config`.
    ///
    /// Fails with [`RewriteError::ProviderNotConfigured`] when no provider
    /// can be constructed.
    pub fn new(config: RewriteConfig) -> Result<Self, RewriteError> {
        let tools = toolchain_for(&config);
        let rewriter = resolve_rewriter(&config)?;
        Ok(Self {
            config: Arc::new(config),
            tools,
            rewriter,
        })
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Process `input` into `output`.
    ///
    /// On success `output` exists and is non-empty. On failure it is left
    /// untouched. Either way no file of this run remains in the work dir.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<RunReport, RewriteError> {
        let callback: &dyn PipelineProgressCallback = match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &NoopProgressCallback,
        };
        let mut clock = StageClock::new(callback);

        let result = match self.prepare(input, output) {
            Ok(mut artifacts) => {
                callback.on_run_start(input);
                let result = self.run_stages(input, output, &mut artifacts, &mut clock).await;
                let leftovers = artifacts.cleanup();
                if leftovers > 0 {
                    warn!("{} temporary path(s) could not be removed", leftovers);
                }
                result
            }
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            let stage = clock.fail(e);
            error!("Processing failed at {}: {}", stage, e);
            callback.on_stage_failed(stage, &e.to_string());
        }
        callback.on_run_complete(result.is_ok());
        result
    }

    fn prepare(&self, input: &Path, output: &Path) -> Result<RunArtifacts, RewriteError> {
        input::validate_input(input)?;
        if same_file(input, output) {
            return Err(RewriteError::InvalidConfig(format!(
                "output '{}' would overwrite the input",
                output.display()
            )));
        }
        RunArtifacts::create(&self.config.work_dir())
    }

    async fn run_stages(
        &self,
        input: &Path,
        output: &Path,
        artifacts: &mut RunArtifacts,
        clock: &mut StageClock<'_>,
    ) -> Result<RunReport, RewriteError> {
        let config = self.config.as_ref();
        let tools = self.tools.as_ref();
        let run_start = Instant::now();
        info!("Processing {}", input.display());

        // ── Count ────────────────────────────────────────────────────────
        clock.advance();
        let page_count = document::page_count(input).await;
        if page_count == 0 {
            return Err(RewriteError::EmptyDocument {
                path: input.to_path_buf(),
            });
        }
        let n = config.pages_to_process;
        let pages_rewritten = n.min(page_count);
        info!("PDF has {} page(s); rewriting {}", page_count, pages_rewritten);
        clock.has_tail = page_count > n;
        clock.complete();

        // ── Classify + extract ───────────────────────────────────────────
        clock.advance();
        let verdict = classify_document(tools, input, config.scan_policy).await;
        info!("Document looks {:?}", verdict);
        let text = extract::extract_text(
            tools,
            input,
            verdict,
            pages_rewritten,
            Duration::from_secs(config.ocr_timeout_secs),
            artifacts,
        )
        .await?;
        clock.complete();

        // ── AI rewrite ───────────────────────────────────────────────────
        clock.advance();
        let instruction = config.rewrite_prompt.as_deref().unwrap_or(REWRITE_PROMPT);
        let rewritten = rewrite_text(
            self.rewriter.as_ref(),
            instruction,
            &text,
            config.api_timeout_secs,
        )
        .await?;
        let markup = postprocess::clean_markup(&rewritten.content);
        if markup.is_empty() {
            return Err(RewriteError::AiFailed {
                message: "response contained no body markup".to_string(),
            });
        }
        debug!("Markup: {} chars", markup.len());
        clock.complete();

        // ── Render ───────────────────────────────────────────────────────
        clock.advance();
        let rendered = render::render_markup(
            tools,
            artifacts,
            &markup,
            &config.document_title,
            &config.stylesheet,
        )
        .await?;
        let rendered_pages = document::page_count(&rendered).await;
        if rendered_pages != pages_rewritten {
            warn!(
                "Rewritten content rendered to {} page(s) in place of {}; output page count will differ",
                rendered_pages, pages_rewritten
            );
        }
        clock.complete();

        // ── Splice ───────────────────────────────────────────────────────
        clock.advance();
        let tail = if clock.current == Stage::Spliced {
            let tail = document::tail_path(artifacts.dir());
            artifacts.track(&tail);
            let tail_pages = document::splice_tail(input, n + 1, &tail).await?;
            clock.complete();
            clock.advance();
            Some((tail, tail_pages))
        } else {
            debug!("No pages past {}; skipping splice", n);
            None
        };

        // ── Merge ────────────────────────────────────────────────────────
        let mut parts = vec![rendered];
        if let Some((ref tail_path, _)) = tail {
            parts.push(tail_path.clone());
        }
        let output_bytes = merge::merge_or_copy(tools, artifacts, &parts, output).await?;
        clock.complete();
        clock.advance();

        let report = RunReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            page_count,
            pages_rewritten,
            rendered_pages,
            tail_pages: tail.map(|(_, pages)| pages).unwrap_or(0),
            verdict,
            extracted_chars: text.chars().count(),
            markup_chars: markup.chars().count(),
            output_bytes,
            input_tokens: rewritten.input_tokens,
            output_tokens: rewritten.output_tokens,
            stages: clock.timings.clone(),
            total_duration_ms: run_start.elapsed().as_millis() as u64,
        };
        info!(
            "Done: {} ({} bytes, {}ms)",
            output.display(),
            output_bytes,
            report.total_duration_ms
        );
        Ok(report)
    }
}

/// Walks a run through [`Stage::next`], timing each stage and forwarding
/// events to the callback.
struct StageClock<'a> {
    callback: &'a dyn PipelineProgressCallback,
    current: Stage,
    /// Whether `Rendered` continues through `Spliced`; known once counted.
    has_tail: bool,
    started: Instant,
    timings: Vec<StageTiming>,
}

impl<'a> StageClock<'a> {
    fn new(callback: &'a dyn PipelineProgressCallback) -> Self {
        Self {
            callback,
            current: Stage::Init,
            has_tail: false,
            started: Instant::now(),
            timings: Vec::new(),
        }
    }

    /// Move to the next state. Terminal states are not announced.
    fn advance(&mut self) {
        self.current = self.current.next(self.has_tail);
        if self.current.is_terminal() {
            debug!("Run reached {}", self.current);
            return;
        }
        debug!("Stage: {}", self.current);
        self.started = Instant::now();
        self.callback.on_stage_start(self.current);
    }

    /// Mark the run failed and return the stage that failed.
    ///
    /// Errors raised before the first stage carry their own stage.
    fn fail(&mut self, error: &RewriteError) -> Stage {
        let stage = match self.current {
            Stage::Init => error.failed_stage(),
            current => current,
        };
        self.current = Stage::Failed;
        stage
    }

    fn complete(&mut self) {
        let duration_ms = self.started.elapsed().as_millis() as u64;
        self.timings.push(StageTiming {
            stage: self.current,
            duration_ms,
        });
        self.callback.on_stage_complete(self.current, duration_ms);
    }
}

fn toolchain_for(config: &RewriteConfig) -> Arc<dyn Toolchain> {
    match config.toolchain {
        Some(ref tools) => Arc::clone(tools),
        None => Arc::new(SystemToolchain::from_config(config)),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Replace the first N pages of `input` with AI-rewritten pages and write
/// the result to `output`.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_rewrite::{process, RewriteConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RewriteConfig::builder().provider_name("gemini").build()?;
/// let report = process("report.pdf", "processed_report.pdf", &config).await?;
/// eprintln!("{} page(s) rewritten", report.pages_rewritten);
/// # Ok(())
/// # }
/// ```
pub async fn process(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &RewriteConfig,
) -> Result<RunReport, RewriteError> {
    Pipeline::new(config.clone())?
        .run(input.as_ref(), output.as_ref())
        .await
}

/// Boolean form of [`process`]: `true` iff `output` was written.
///
/// The error is logged, not returned.
pub async fn process_pdf(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &RewriteConfig,
) -> bool {
    match process(input, output, config).await {
        Ok(_) => true,
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn process_sync(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &RewriteConfig,
) -> Result<RunReport, RewriteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RewriteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(input, output, config))
}

/// Count pages and classify the document without calling the AI provider.
pub async fn inspect(
    input: impl AsRef<Path>,
    config: &RewriteConfig,
) -> Result<InspectReport, RewriteError> {
    let input = input.as_ref();
    input::validate_input(input)?;

    let page_count = document::page_count(input).await;
    if page_count == 0 {
        return Err(RewriteError::EmptyDocument {
            path: input.to_path_buf(),
        });
    }

    let tools = toolchain_for(config);
    let verdict: Verdict = classify_document(tools.as_ref(), input, config.scan_policy).await;
    Ok(InspectReport {
        input: input.to_path_buf(),
        page_count,
        verdict,
        pages_to_process: config.pages_to_process,
        has_tail: page_count > config.pages_to_process,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_file_requires_both_to_exist() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        std::fs::write(&a, b"%PDF").unwrap();
        assert!(same_file(&a, &dir.path().join(".").join("a.pdf")));
        assert!(!same_file(&a, &dir.path().join("b.pdf")));
    }

    #[test]
    fn clock_records_completed_stages() {
        let cb = NoopProgressCallback;
        let mut clock = StageClock::new(&cb);
        clock.advance();
        clock.complete();
        clock.advance();
        assert_eq!(clock.current, Stage::Extracted);
        assert_eq!(clock.timings.len(), 1);
        assert_eq!(clock.timings[0].stage, Stage::Counted);
    }

    fn walk_to_done(has_tail: bool) -> Vec<Stage> {
        let cb = NoopProgressCallback;
        let mut clock = StageClock::new(&cb);
        clock.advance();
        clock.has_tail = has_tail;
        while !clock.current.is_terminal() {
            clock.complete();
            clock.advance();
        }
        assert_eq!(clock.current, Stage::Done);
        clock.timings.iter().map(|t| t.stage).collect()
    }

    #[test]
    fn clock_splices_only_with_a_tail() {
        assert!(walk_to_done(true).contains(&Stage::Spliced));
        let short = walk_to_done(false);
        assert!(!short.contains(&Stage::Spliced));
        assert_eq!(short.last(), Some(&Stage::Merged));
    }

    #[test]
    fn failing_clock_ends_in_failed_state() {
        let cb = NoopProgressCallback;
        let mut clock = StageClock::new(&cb);
        clock.advance();
        clock.advance();
        let stage = clock.fail(&RewriteError::Internal("boom".into()));
        assert_eq!(stage, Stage::Extracted);
        assert_eq!(clock.current, Stage::Failed);
        assert!(clock.current.is_terminal());
    }

    #[test]
    fn failure_before_first_stage_uses_error_stage() {
        let cb = NoopProgressCallback;
        let mut clock = StageClock::new(&cb);
        let err = RewriteError::FileNotFound {
            path: "missing.pdf".into(),
        };
        assert_eq!(clock.fail(&err), err.failed_stage());
        assert_eq!(clock.current, Stage::Failed);
    }

    #[tokio::test]
    async fn process_pdf_is_false_for_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = RewriteConfig::builder()
            .rewriter(Arc::new(NeverCalled))
            .work_dir(dir.path())
            .build()
            .unwrap();
        let out = dir.path().join("out.pdf");
        assert!(!process_pdf(dir.path().join("missing.pdf"), &out, &config).await);
        assert!(!out.exists());
    }

    struct NeverCalled;

    #[async_trait::async_trait]
    impl TextRewriter for NeverCalled {
        async fn rewrite(
            &self,
            _: &str,
            _: &str,
        ) -> Result<crate::pipeline::rewrite::Rewritten, RewriteError> {
            panic!("rewriter must not be called")
        }
    }
}
