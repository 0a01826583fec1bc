//! Configuration types for the page-rewrite pipeline.
//!
//! All run behaviour is controlled through [`RewriteConfig`], built via its
//! [`RewriteConfigBuilder`]. The config is an immutable value passed
//! explicitly into every stage: credentials and tool locations are decided
//! once, at process start, and nothing below this module reads the
//! environment. Tests swap in fakes through [`RewriteConfig::toolchain`] and
//! [`RewriteConfig::rewriter`].

use crate::error::RewriteError;
use crate::pipeline::classify::ScanPolicy;
use crate::pipeline::rewrite::TextRewriter;
use crate::pipeline::tools::Toolchain;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for a page-rewrite run.
///
/// Built via [`RewriteConfig::builder()`] or using [`RewriteConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf_rewrite::RewriteConfig;
///
/// let config = RewriteConfig::builder()
///     .pages_to_process(3)
///     .provider_name("gemini")
///     .poppler_dir("/usr/bin")
///     .build()
///     .unwrap();
/// assert_eq!(config.pages_to_process, 3);
/// ```
#[derive(Clone)]
pub struct RewriteConfig {
    /// Number of leading pages replaced by rewritten content (N). Default: 2.
    pub pages_to_process: usize,

    /// Scanned-vs-text heuristic. Default: fewer than 20 words on page 1 ⇒ scanned.
    pub scan_policy: ScanPolicy,

    /// Rasterisation resolution for the OCR path. Default: 200.
    pub ocr_dpi: u32,

    /// Tesseract language code. Default: "eng".
    pub ocr_language: String,

    /// Per-page OCR timeout in seconds. Default: 60.
    pub ocr_timeout_secs: u64,

    /// Timeout for every other external tool call. Default: 300.
    ///
    /// LibreOffice cold starts can take tens of seconds on a loaded host.
    pub tool_timeout_secs: u64,

    /// Timeout for the single AI round trip. Default: 120.
    pub api_timeout_secs: u64,

    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    /// If None along with `rewriter`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed rewriter. Takes precedence over `provider_name`.
    pub rewriter: Option<Arc<dyn TextRewriter>>,

    /// Pre-constructed toolchain. Takes precedence over `tools`.
    pub toolchain: Option<Arc<dyn Toolchain>>,

    /// Locations of the external binaries used by the system toolchain.
    pub tools: ToolPaths,

    /// Sampling temperature for the rewrite. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 8192.
    pub max_tokens: usize,

    /// Custom rewrite instruction. If None, uses [`crate::prompts::REWRITE_PROMPT`].
    pub rewrite_prompt: Option<String>,

    /// `<title>` of the intermediate HTML document. Default: "Processed PDF".
    pub document_title: String,

    /// Inline stylesheet of the intermediate HTML document.
    pub stylesheet: String,

    /// Directory in which per-run scratch directories are created.
    /// Default: the system temp directory.
    pub work_dir: Option<PathBuf>,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            pages_to_process: 2,
            scan_policy: ScanPolicy::default(),
            ocr_dpi: 200,
            ocr_language: "eng".to_string(),
            ocr_timeout_secs: 60,
            tool_timeout_secs: 300,
            api_timeout_secs: 120,
            model: None,
            provider_name: None,
            rewriter: None,
            toolchain: None,
            tools: ToolPaths::default(),
            temperature: 0.2,
            max_tokens: 8192,
            rewrite_prompt: None,
            document_title: "Processed PDF".to_string(),
            stylesheet: crate::pipeline::render::DEFAULT_STYLESHEET.to_string(),
            work_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RewriteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteConfig")
            .field("pages_to_process", &self.pages_to_process)
            .field("scan_policy", &self.scan_policy)
            .field("ocr_dpi", &self.ocr_dpi)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("rewriter", &self.rewriter.as_ref().map(|_| "<dyn TextRewriter>"))
            .field("toolchain", &self.toolchain.as_ref().map(|_| "<dyn Toolchain>"))
            .field("tools", &self.tools)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl RewriteConfig {
    /// Create a new builder for `RewriteConfig`.
    pub fn builder() -> RewriteConfigBuilder {
        RewriteConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory where run scratch directories are created.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`RewriteConfig`].
#[derive(Debug)]
pub struct RewriteConfigBuilder {
    config: RewriteConfig,
}

impl RewriteConfigBuilder {
    pub fn pages_to_process(mut self, n: usize) -> Self {
        self.config.pages_to_process = n;
        self
    }

    pub fn scan_min_words(mut self, words: usize) -> Self {
        self.config.scan_policy = ScanPolicy::new(words);
        self
    }

    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.config.ocr_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn rewriter(mut self, rewriter: Arc<dyn TextRewriter>) -> Self {
        self.config.rewriter = Some(rewriter);
        self
    }

    pub fn toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.config.toolchain = Some(toolchain);
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn poppler_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tools.poppler_dir = Some(dir.into());
        self
    }

    pub fn soffice(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tools.soffice = path.into();
        self
    }

    pub fn tesseract(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tools.tesseract = path.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn rewrite_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.rewrite_prompt = Some(prompt.into());
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.config.document_title = title.into();
        self
    }

    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.config.stylesheet = css.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RewriteConfig, RewriteError> {
        let c = &self.config;
        if c.pages_to_process == 0 {
            return Err(RewriteError::InvalidConfig(
                "pages_to_process must be ≥ 1".into(),
            ));
        }
        if c.ocr_timeout_secs == 0 || c.tool_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(RewriteError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(RewriteError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if let Some(ref dir) = c.work_dir {
            if !dir.is_dir() {
                return Err(RewriteError::InvalidConfig(format!(
                    "work dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Tool locations ───────────────────────────────────────────────────────

/// Where to find the external binaries driven by
/// [`crate::pipeline::tools::SystemToolchain`].
///
/// Poppler tools (`pdftotext`, `pdftoppm`, `pdfunite`) are looked up in
/// `poppler_dir` when set, otherwise on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub poppler_dir: Option<PathBuf>,
    pub soffice: PathBuf,
    pub tesseract: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            poppler_dir: None,
            soffice: PathBuf::from("soffice"),
            tesseract: PathBuf::from("tesseract"),
        }
    }
}

impl ToolPaths {
    pub fn pdftotext(&self) -> PathBuf {
        self.poppler_tool("pdftotext")
    }

    pub fn pdftoppm(&self) -> PathBuf {
        self.poppler_tool("pdftoppm")
    }

    pub fn pdfunite(&self) -> PathBuf {
        self.poppler_tool("pdfunite")
    }

    fn poppler_tool(&self, name: &str) -> PathBuf {
        let file = format!("{name}{}", std::env::consts::EXE_SUFFIX);
        match self.poppler_dir {
            Some(ref dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }

    /// `true` when `program` is a bare command name to be resolved on `PATH`.
    pub fn is_bare_command(program: &Path) -> bool {
        program.components().count() == 1 && !program.is_absolute()
    }
}
