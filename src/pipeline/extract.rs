//! Text extraction for the pages that will be rewritten.
//!
//! Two mutually exclusive strategies, chosen by
//! [`crate::pipeline::classify::Verdict`]:
//!
//! * **Direct** — `pdftotext` bounded to pages `1..=N`.
//! * **OCR** — rasterise pages `1..=N` into the run directory, then OCR each
//!   image in page order with a per-page timeout. Each page's text is
//!   followed by a blank line so page boundaries survive as paragraphs.
//!
//! Both return either non-empty text or an error. Partial OCR output is
//! never returned: one failed page fails the whole extraction.

use crate::artifacts::RunArtifacts;
use crate::error::RewriteError;
use crate::pipeline::classify::Verdict;
use crate::pipeline::tools::Toolchain;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Extract the text of the first `pages` pages using the strategy in `verdict`.
///
/// Returns [`RewriteError::NothingToRewrite`] when the extractor succeeded
/// but found only whitespace.
pub async fn extract_text(
    tools: &dyn Toolchain,
    pdf: &Path,
    verdict: Verdict,
    pages: usize,
    ocr_timeout: Duration,
    artifacts: &mut RunArtifacts,
) -> Result<String, RewriteError> {
    info!(
        "Extracting text from first {} page(s) via {}",
        pages,
        verdict.method()
    );
    let text = match verdict {
        Verdict::Text => extract_direct(tools, pdf, pages).await?,
        Verdict::Scanned => extract_ocr(tools, pdf, pages, ocr_timeout, artifacts).await?,
    };

    if text.trim().is_empty() {
        return Err(RewriteError::NothingToRewrite { pages });
    }
    debug!("Extracted {} chars", text.len());
    Ok(text)
}

/// Direct extraction of pages `1..=pages` from the text layer.
pub async fn extract_direct(
    tools: &dyn Toolchain,
    pdf: &Path,
    pages: usize,
) -> Result<String, RewriteError> {
    tools
        .extract_text(pdf, 1, pages)
        .await
        .map_err(|e| RewriteError::ExtractionFailed {
            method: Verdict::Text.method(),
            detail: e.to_string(),
        })
}

/// OCR of pages `1..=pages`; page images live in `<run dir>/pages/`.
pub async fn extract_ocr(
    tools: &dyn Toolchain,
    pdf: &Path,
    pages: usize,
    timeout: Duration,
    artifacts: &mut RunArtifacts,
) -> Result<String, RewriteError> {
    let fail = |detail: String| RewriteError::ExtractionFailed {
        method: Verdict::Scanned.method(),
        detail,
    };

    let image_dir = artifacts.path("pages");
    artifacts.track(&image_dir);
    tokio::fs::create_dir_all(&image_dir)
        .await
        .map_err(|e| fail(format!("cannot create image directory: {e}")))?;

    let images = tools
        .rasterize(pdf, pages, &image_dir)
        .await
        .map_err(|e| fail(e.to_string()))?;
    if images.is_empty() {
        return Err(fail("rasteriser produced no images".to_string()));
    }

    let mut text = String::new();
    for (i, image) in images.iter().enumerate() {
        let page_text = tools
            .recognize(image, timeout)
            .await
            .map_err(|e| fail(format!("page {}: {e}", i + 1)))?;
        debug!("OCR page {}: {} chars", i + 1, page_text.len());
        text.push_str(&page_text);
        text.push_str("\n\n");
    }
    Ok(text)
}
