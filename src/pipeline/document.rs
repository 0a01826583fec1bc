//! In-process PDF operations: page counting and tail splicing via `lopdf`.
//!
//! ## Why spawn_blocking?
//!
//! `lopdf` parses the whole file synchronously. Large scanned documents can
//! take hundreds of milliseconds to load, so both operations run on the
//! blocking pool to keep the Tokio worker threads free for concurrent runs.

use crate::error::RewriteError;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Number of pages in `pdf`, or 0 if it cannot be read or parsed.
///
/// A zero count is fatal to the run but never to the process.
pub async fn page_count(pdf: &Path) -> usize {
    let path = pdf.to_path_buf();
    match tokio::task::spawn_blocking(move || page_count_blocking(&path)).await {
        Ok(n) => n,
        Err(e) => {
            warn!("Page-count task panicked: {}", e);
            0
        }
    }
}

/// Blocking implementation of [`page_count`].
pub fn page_count_blocking(pdf: &Path) -> usize {
    match load_document(pdf) {
        Ok(doc) => doc.get_pages().len(),
        Err(detail) => {
            warn!(
                "Could not read {}: {}. It may be corrupted.",
                pdf.file_name().unwrap_or_default().to_string_lossy(),
                detail
            );
            0
        }
    }
}

/// Write pages `start_page..=end` of `original` to `output` as a standalone PDF.
///
/// `start_page` is 1-based. Returns the number of pages written.
pub async fn splice_tail(
    original: &Path,
    start_page: usize,
    output: &Path,
) -> Result<usize, RewriteError> {
    let src = original.to_path_buf();
    let dst = output.to_path_buf();

    tokio::task::spawn_blocking(move || splice_tail_blocking(&src, start_page, &dst))
        .await
        .map_err(|e| RewriteError::Internal(format!("Splice task panicked: {}", e)))?
}

/// Blocking implementation of [`splice_tail`].
fn splice_tail_blocking(
    original: &Path,
    start_page: usize,
    output: &Path,
) -> Result<usize, RewriteError> {
    let fail = |detail: String| RewriteError::SpliceFailed {
        path: original.to_path_buf(),
        start: start_page,
        detail,
    };

    let mut doc = load_document(original).map_err(fail)?;
    let total = doc.get_pages().len();
    if start_page < 1 || start_page > total {
        return Err(fail(format!(
            "start page out of range (document has {total} pages)"
        )));
    }

    let leading: Vec<u32> = (1..start_page as u32).collect();
    if !leading.is_empty() {
        doc.delete_pages(&leading);
        doc.prune_objects();
    }

    let written = doc.get_pages().len();
    doc.save(output)
        .map_err(|e| fail(format!("cannot write '{}': {e}", output.display())))?;

    info!(
        "Spliced pages {}..{} into {} ({} pages)",
        start_page,
        total,
        output.display(),
        written
    );
    Ok(written)
}

/// Load a PDF, transparently decrypting documents protected by an empty
/// user password.
fn load_document(pdf: &Path) -> Result<Document, String> {
    let mut doc = Document::load(pdf).map_err(|e| e.to_string())?;
    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|e| format!("encrypted PDF could not be opened: {e}"))?;
        debug!("Decrypted {} with empty password", pdf.display());
    }
    Ok(doc)
}

/// Output location of the spliced tail inside a run directory.
pub fn tail_path(run_dir: &Path) -> PathBuf {
    run_dir.join("remaining.pdf")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build an `n`-page PDF whose page `i` shows the text `"<label> page i"`.
    pub(crate) fn write_pdf(path: &Path, n: usize, label: &str) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(n);
        for i in 1..=n {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("{label} page {i}"))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => n as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[tokio::test]
    async fn counts_pages() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("five.pdf");
        write_pdf(&p, 5, "orig");
        assert_eq!(page_count(&p).await, 5);
    }

    #[tokio::test]
    async fn corrupt_file_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("broken.pdf");
        std::fs::write(&p, b"%PDF-1.4\nthis is not a pdf body").unwrap();
        assert_eq!(page_count(&p).await, 0);
        assert_eq!(page_count(&dir.path().join("missing.pdf")).await, 0);
    }

    #[tokio::test]
    async fn splice_keeps_pages_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("five.pdf");
        let out = tail_path(dir.path());
        write_pdf(&src, 5, "orig");

        let written = splice_tail(&src, 3, &out).await.unwrap();
        assert_eq!(written, 3);
        assert_eq!(page_count(&out).await, 3);
        // Source is untouched.
        assert_eq!(page_count(&src).await, 5);
    }

    #[tokio::test]
    async fn splice_from_first_page_copies_everything() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("two.pdf");
        let out = dir.path().join("all.pdf");
        write_pdf(&src, 2, "orig");
        assert_eq!(splice_tail(&src, 1, &out).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn splice_out_of_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("two.pdf");
        let out = dir.path().join("tail.pdf");
        write_pdf(&src, 2, "orig");

        let err = splice_tail(&src, 3, &out).await.unwrap_err();
        assert!(matches!(err, RewriteError::SpliceFailed { start: 3, .. }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn splice_corrupt_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.pdf");
        std::fs::write(&src, b"%PDF-garbage").unwrap();
        let err = splice_tail(&src, 2, &dir.path().join("t.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, RewriteError::SpliceFailed { .. }));
    }
}
