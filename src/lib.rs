//! # edgequake-pdf-rewrite
//!
//! Rewrite the opening pages of a PDF with a language model and stitch the
//! result back onto the untouched rest of the document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Count    page count via lopdf (0 ⇒ fail)
//!  ├─ 2. Classify fewer than 20 words on page 1 ⇒ scanned
//!  ├─ 3. Extract  pdftotext, or pdftoppm + tesseract for scans (first N pages)
//!  ├─ 4. Rewrite  one LLM call returning an HTML body fragment
//!  ├─ 5. Render   soffice --headless --convert-to pdf
//!  ├─ 6. Splice   original pages N+1..end via lopdf (only if they exist)
//!  ├─ 7. Merge    pdfunite rendered + tail, or copy if there is no tail
//!  └─ 8. Cleanup  every intermediate file, on success and failure
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_rewrite::{process, RewriteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = RewriteConfig::default();
//!     let report = process("contract.pdf", "processed_contract.pdf", &config).await?;
//!     eprintln!("{} → {} bytes", report.verdict.method(), report.output_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! | Tool | Used for |
//! |------|----------|
//! | `pdftotext`, `pdftoppm`, `pdfunite` (poppler-utils) | extraction, rasterisation, merge |
//! | `tesseract` | OCR of scanned pages |
//! | `soffice` (LibreOffice) | HTML → PDF |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-rewrite` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifacts;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod stage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RewriteConfig, RewriteConfigBuilder, ToolPaths, DEFAULT_MODEL};
pub use error::{RewriteError, ToolError};
pub use output::{InspectReport, RunReport, StageTiming};
pub use pipeline::classify::{ScanPolicy, Verdict};
pub use pipeline::rewrite::{LlmRewriter, Rewritten, TextRewriter};
pub use pipeline::tools::{SystemToolchain, Toolchain};
pub use process::{inspect, process, process_pdf, process_sync, Pipeline};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use stage::Stage;
