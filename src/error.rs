//! Error types for the edgequake-pdf-rewrite library.
//!
//! Two error types reflect two layers of the pipeline:
//!
//! * [`RewriteError`] — **Fatal**: the run cannot produce an output document
//!   (unreadable input, extraction failure, AI failure, render failure,
//!   splice/merge failure). Returned as `Err(RewriteError)` from
//!   [`crate::process`]. Every variant means *no* output file was written.
//!
//! * [`ToolError`] — a single external-tool invocation failed (binary
//!   missing, non-zero exit, timeout). Produced by
//!   [`crate::pipeline::tools::Toolchain`] implementations and mapped by
//!   each stage into the matching [`RewriteError`] variant.
//!
//! Cleanup failures are neither: they are logged and swallowed so that a
//! stale temp file can never mask the primary result of a run.

use crate::stage::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-rewrite library.
#[derive(Debug, Error)]
pub enum RewriteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF could not be parsed or reports zero pages.
    #[error("PDF '{path}' has no readable pages (corrupt or empty document)")]
    EmptyDocument { path: PathBuf },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Direct text extraction or OCR failed.
    #[error("{method} extraction failed: {detail}")]
    ExtractionFailed {
        method: &'static str,
        detail: String,
    },

    /// Extraction succeeded but produced no text at all.
    #[error("No text could be extracted from the first {pages} page(s); nothing to rewrite")]
    NothingToRewrite { pages: usize },

    // ── AI errors ─────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The text service returned an error or an empty response.
    #[error("AI rewrite failed: {message}")]
    AiFailed { message: String },

    /// The text service did not answer within the configured timeout.
    #[error("AI rewrite timed out after {secs}s")]
    AiTimeout { secs: u64 },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The document renderer binary is missing or not executable.
    #[error(
        "Document renderer not found at '{path}'\n\
Install LibreOffice or point --soffice / SOFFICE_PATH at the soffice binary."
    )]
    RendererNotFound { path: PathBuf },

    /// The renderer ran but reported a failure.
    #[error("Rendering '{source_path}' to PDF failed: {detail}")]
    RenderFailed {
        source_path: PathBuf,
        detail: String,
    },

    /// The renderer exited without depositing the expected PDF.
    #[error("Renderer produced no output: expected '{expected}'")]
    RenderOutputMissing { expected: PathBuf },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Extracting the untouched tail pages into a standalone PDF failed.
    #[error("Failed to splice pages {start}..end of '{path}': {detail}")]
    SpliceFailed {
        path: PathBuf,
        start: usize,
        detail: String,
    },

    /// Concatenating the rendered pages with the tail failed.
    #[error("Failed to merge {parts} PDF part(s): {detail}")]
    MergeFailed { parts: usize, detail: String },

    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The final output exists but is empty.
    #[error("Output file '{path}' is empty")]
    OutputEmpty { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RewriteError {
    /// The stage this error prevented the run from reaching.
    pub fn failed_stage(&self) -> Stage {
        match self {
            RewriteError::InvalidConfig(_)
            | RewriteError::ProviderNotConfigured { .. }
            | RewriteError::Internal(_) => Stage::Init,
            RewriteError::FileNotFound { .. }
            | RewriteError::PermissionDenied { .. }
            | RewriteError::NotAPdf { .. }
            | RewriteError::EmptyDocument { .. } => Stage::Counted,
            RewriteError::ExtractionFailed { .. } | RewriteError::NothingToRewrite { .. } => {
                Stage::Extracted
            }
            RewriteError::AiFailed { .. } | RewriteError::AiTimeout { .. } => Stage::Rewritten,
            RewriteError::RendererNotFound { .. }
            | RewriteError::RenderFailed { .. }
            | RewriteError::RenderOutputMissing { .. } => Stage::Rendered,
            RewriteError::SpliceFailed { .. } => Stage::Spliced,
            RewriteError::MergeFailed { .. }
            | RewriteError::OutputWriteFailed { .. }
            | RewriteError::OutputEmpty { .. } => Stage::Merged,
        }
    }
}

/// Failure of a single external-tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The binary does not exist or is not on `PATH`.
    #[error("'{program}' not found")]
    NotFound { program: PathBuf },

    /// The binary exists but could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: PathBuf,
        status: String,
        stderr: String,
    },

    /// The tool did not finish within its time budget and was killed.
    #[error("'{program}' timed out after {secs}s")]
    Timeout { program: PathBuf, secs: u64 },

    /// Reading the tool's results from disk failed.
    #[error("I/O error around '{program}': {source}")]
    Io {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// `true` when the binary itself could not be found or spawned.
    pub fn is_missing_binary(&self) -> bool {
        match self {
            ToolError::NotFound { .. } => true,
            ToolError::Spawn { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// The binary this invocation was about.
    pub fn program(&self) -> &std::path::Path {
        match self {
            ToolError::NotFound { program }
            | ToolError::Spawn { program, .. }
            | ToolError::Exit { program, .. }
            | ToolError::Timeout { program, .. }
            | ToolError::Io { program, .. } => program,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failed_display() {
        let e = RewriteError::ExtractionFailed {
            method: "OCR",
            detail: "tesseract timed out".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("OCR extraction failed"), "got: {msg}");
        assert!(msg.contains("tesseract timed out"));
    }

    #[test]
    fn splice_failed_display() {
        let e = RewriteError::SpliceFailed {
            path: PathBuf::from("in.pdf"),
            start: 3,
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("pages 3..end"));
    }

    #[test]
    fn renderer_not_found_mentions_flag() {
        let e = RewriteError::RendererNotFound {
            path: PathBuf::from("/opt/nowhere/soffice"),
        };
        assert!(e.to_string().contains("--soffice"));
    }

    #[test]
    fn error_stage_mapping() {
        assert_eq!(
            RewriteError::EmptyDocument { path: "x".into() }.failed_stage(),
            Stage::Counted
        );
        assert_eq!(
            RewriteError::AiTimeout { secs: 5 }.failed_stage(),
            Stage::Rewritten
        );
        assert_eq!(
            RewriteError::RenderOutputMissing {
                expected: "x.pdf".into()
            }
            .failed_stage(),
            Stage::Rendered
        );
    }

    #[test]
    fn missing_binary_detection() {
        let e = ToolError::Spawn {
            program: "pdfunite".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert!(e.is_missing_binary());

        let e = ToolError::Exit {
            program: "pdfunite".into(),
            status: "exit status: 1".into(),
            stderr: "Syntax Error".into(),
        };
        assert!(!e.is_missing_binary());
    }
}
