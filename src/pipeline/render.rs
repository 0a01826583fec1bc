//! HTML-to-PDF rendering of the rewritten pages.
//!
//! The cleaned fragment is wrapped in a minimal UTF-8 document with an inline
//! stylesheet, written to `<run dir>/rewritten.html`, and converted by the
//! document renderer into `<run dir>/rewritten.pdf`. Both paths are tracked
//! for cleanup before anything is written, so a renderer crash leaves no
//! residue.

use crate::artifacts::RunArtifacts;
use crate::error::RewriteError;
use crate::pipeline::tools::Toolchain;
use std::path::PathBuf;
use tracing::{debug, info};

/// Stylesheet embedded in every rendered document.
pub const DEFAULT_STYLESHEET: &str =
    "body { font-family: sans-serif; line-height: 1.6; } h1, h2, h3 { font-weight: 600; }";

const HTML_NAME: &str = "rewritten.html";
const PDF_NAME: &str = "rewritten.pdf";

/// Wrap a body fragment in a complete HTML document.
pub fn wrap_document(fragment: &str, title: &str, stylesheet: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head>\n\
<meta charset=\"UTF-8\">\n\
<title>{}</title>\n\
<style>{}</style>\n\
</head>\n\
<body>\n\
{}\n\
</body>\n\
</html>\n",
        escape_text(title),
        stylesheet,
        fragment.trim_end()
    )
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `markup` to a PDF inside the run directory and return its path.
pub async fn render_markup(
    tools: &dyn Toolchain,
    artifacts: &mut RunArtifacts,
    markup: &str,
    title: &str,
    stylesheet: &str,
) -> Result<PathBuf, RewriteError> {
    let html_path = artifacts.path(HTML_NAME);
    let pdf_path = artifacts.path(PDF_NAME);
    artifacts.track(&html_path);
    artifacts.track(&pdf_path);

    let document = wrap_document(markup, title, stylesheet);
    tokio::fs::write(&html_path, document.as_bytes())
        .await
        .map_err(|e| RewriteError::RenderFailed {
            source_path: html_path.clone(),
            detail: format!("cannot write HTML: {e}"),
        })?;
    debug!("Wrote {} ({} bytes)", html_path.display(), document.len());

    tools
        .render_document(&html_path, artifacts.dir())
        .await
        .map_err(|e| {
            if e.is_missing_binary() {
                RewriteError::RendererNotFound {
                    path: e.program().to_path_buf(),
                }
            } else {
                RewriteError::RenderFailed {
                    source_path: html_path.clone(),
                    detail: e.to_string(),
                }
            }
        })?;

    let rendered = tokio::fs::metadata(&pdf_path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !rendered {
        return Err(RewriteError::RenderOutputMissing { expected: pdf_path });
    }

    info!("Rendered rewritten pages to {}", pdf_path.display());
    Ok(pdf_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;

    /// Renderer stub: `Ok(true)` writes the PDF, `Ok(false)` exits cleanly
    /// without writing, `Err` fails.
    struct Renderer(Result<bool, fn() -> ToolError>);

    #[async_trait]
    impl Toolchain for Renderer {
        async fn extract_text(&self, _: &Path, _: usize, _: usize) -> Result<String, ToolError> {
            unreachable!()
        }
        async fn rasterize(&self, _: &Path, _: usize, _: &Path) -> Result<Vec<PathBuf>, ToolError> {
            unreachable!()
        }
        async fn recognize(&self, _: &Path, _: Duration) -> Result<String, ToolError> {
            unreachable!()
        }
        async fn render_document(&self, source: &Path, out_dir: &Path) -> Result<(), ToolError> {
            match self.0 {
                Ok(true) => {
                    let stem = source.file_stem().unwrap();
                    let out = out_dir.join(stem).with_extension("pdf");
                    std::fs::write(out, b"%PDF-1.5 rendered").unwrap();
                    Ok(())
                }
                Ok(false) => Ok(()),
                Err(make) => Err(make()),
            }
        }
        async fn merge(&self, _: &[PathBuf], _: &Path) -> Result<(), ToolError> {
            unreachable!()
        }
    }

    fn run_dir() -> (tempfile::TempDir, RunArtifacts) {
        let work = tempfile::tempdir().unwrap();
        let run = RunArtifacts::create(work.path()).unwrap();
        (work, run)
    }

    #[test]
    fn wrap_document_embeds_fragment_and_escapes_title() {
        let html = wrap_document("<h1>Hi</h1>\n", "Q&A <draft>", DEFAULT_STYLESHEET);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"UTF-8\">"));
        assert!(html.contains("<title>Q&amp;A &lt;draft&gt;</title>"));
        assert!(html.contains("<body>\n<h1>Hi</h1>\n</body>"));
        assert!(html.contains("line-height: 1.6"));
    }

    #[tokio::test]
    async fn renders_into_run_dir() {
        let (_w, mut run) = run_dir();
        let tools = Renderer(Ok(true));
        let pdf = render_markup(&tools, &mut run, "<p>x</p>", "T", DEFAULT_STYLESHEET)
            .await
            .unwrap();
        assert_eq!(pdf, run.path("rewritten.pdf"));
        let html = std::fs::read_to_string(run.path("rewritten.html")).unwrap();
        assert!(html.contains("<p>x</p>"));
        assert_eq!(run.tracked().len(), 2);
    }

    #[tokio::test]
    async fn missing_output_is_reported() {
        let (_w, mut run) = run_dir();
        let tools = Renderer(Ok(false));
        let err = render_markup(&tools, &mut run, "<p>x</p>", "T", "")
            .await
            .unwrap_err();
        assert!(matches!(err, RewriteError::RenderOutputMissing { .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_renderer_not_found() {
        let (_w, mut run) = run_dir();
        let tools = Renderer(Err(|| ToolError::NotFound {
            program: "/opt/lo/soffice".into(),
        }));
        match render_markup(&tools, &mut run, "<p>x</p>", "T", "").await {
            Err(RewriteError::RendererNotFound { path }) => {
                assert_eq!(path, PathBuf::from("/opt/lo/soffice"))
            }
            other => panic!("expected RendererNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn renderer_exit_is_render_failed() {
        let (_w, mut run) = run_dir();
        let tools = Renderer(Err(|| ToolError::Exit {
            program: "soffice".into(),
            status: "exit status: 1".into(),
            stderr: "Error: source file could not be loaded".into(),
        }));
        let err = render_markup(&tools, &mut run, "<p>x</p>", "T", "")
            .await
            .unwrap_err();
        assert!(matches!(err, RewriteError::RenderFailed { .. }));
        // Both paths are tracked even though the render failed.
        assert_eq!(run.tracked().len(), 2);
    }
}
