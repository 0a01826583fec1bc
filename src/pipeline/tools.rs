//! External-tool capability: one method per binary the pipeline drives.
//!
//! Every collaborator outside this crate (text extractor, rasteriser, OCR
//! engine, document renderer, PDF merger) sits behind [`Toolchain`] so the
//! orchestrator can be exercised with deterministic fakes. The production
//! implementation, [`SystemToolchain`], shells out to poppler-utils
//! (`pdftotext`, `pdftoppm`, `pdfunite`), `tesseract`, and LibreOffice
//! (`soffice`).
//!
//! ## Why `tokio::process` with `kill_on_drop`?
//!
//! Each call is bounded by a timeout. When the timeout fires the
//! `wait_with_output` future is dropped, which drops the `Child`; with
//! `kill_on_drop(true)` that also kills the process instead of leaving a
//! stray LibreOffice instance holding a lock on the run directory.

use crate::config::{RewriteConfig, ToolPaths};
use crate::error::ToolError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// The external binaries the pipeline depends on.
///
/// Page numbers are 1-based and inclusive.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Plain text of pages `first_page..=last_page`.
    async fn extract_text(
        &self,
        pdf: &Path,
        first_page: usize,
        last_page: usize,
    ) -> Result<String, ToolError>;

    /// Rasterise pages `1..=last_page` into `out_dir`, returning the image
    /// paths in page order.
    async fn rasterize(
        &self,
        pdf: &Path,
        last_page: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ToolError>;

    /// Recognised text of a single raster image, bounded by `timeout`.
    async fn recognize(&self, image: &Path, timeout: Duration) -> Result<String, ToolError>;

    /// Convert `source` to PDF, depositing `<out_dir>/<source stem>.pdf`.
    ///
    /// A missing renderer binary must be reported as
    /// [`ToolError::NotFound`] before anything is spawned.
    async fn render_document(&self, source: &Path, out_dir: &Path) -> Result<(), ToolError>;

    /// Concatenate `parts` in order into `output`.
    async fn merge(&self, parts: &[PathBuf], output: &Path) -> Result<(), ToolError>;
}

/// [`Toolchain`] backed by locally installed binaries.
#[derive(Debug, Clone)]
pub struct SystemToolchain {
    tools: ToolPaths,
    ocr_dpi: u32,
    ocr_language: String,
    timeout: Duration,
}

impl SystemToolchain {
    pub fn new(tools: ToolPaths, ocr_dpi: u32, ocr_language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tools,
            ocr_dpi,
            ocr_language: ocr_language.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RewriteConfig) -> Self {
        Self::new(
            config.tools.clone(),
            config.ocr_dpi,
            config.ocr_language.clone(),
            Duration::from_secs(config.tool_timeout_secs),
        )
    }

    /// Prepend the poppler directory to `PATH` so its DLLs resolve on Windows.
    fn poppler_command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        if let Some(ref dir) = self.tools.poppler_dir {
            let mut paths = vec![dir.clone()];
            if let Some(existing) = std::env::var_os("PATH") {
                paths.extend(std::env::split_paths(&existing));
            }
            if let Ok(joined) = std::env::join_paths(paths) {
                cmd.env("PATH", joined);
            }
        }
        cmd
    }
}

#[async_trait]
impl Toolchain for SystemToolchain {
    async fn extract_text(
        &self,
        pdf: &Path,
        first_page: usize,
        last_page: usize,
    ) -> Result<String, ToolError> {
        let program = self.tools.pdftotext();
        let args: Vec<OsString> = vec![
            "-f".into(),
            first_page.to_string().into(),
            "-l".into(),
            last_page.to_string().into(),
            "-enc".into(),
            "UTF-8".into(),
            pdf.into(),
            "-".into(),
        ];
        let output = run_tool(self.poppler_command(&program), &program, &args, self.timeout).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        last_page: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ToolError> {
        let program = self.tools.pdftoppm();
        let prefix = out_dir.join("page");
        let args: Vec<OsString> = vec![
            "-png".into(),
            "-r".into(),
            self.ocr_dpi.to_string().into(),
            "-f".into(),
            "1".into(),
            "-l".into(),
            last_page.to_string().into(),
            pdf.into(),
            prefix.into(),
        ];
        run_tool(self.poppler_command(&program), &program, &args, self.timeout).await?;

        // pdftoppm zero-pads page numbers to a common width within one run,
        // so lexical order is page order.
        let mut images = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await.map_err(|e| ToolError::Io {
            program: program.clone(),
            source: e,
        })?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| ToolError::Io {
            program: program.clone(),
            source: e,
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                images.push(path);
            }
        }
        images.sort();
        debug!("{} produced {} page image(s)", program.display(), images.len());
        Ok(images)
    }

    async fn recognize(&self, image: &Path, timeout: Duration) -> Result<String, ToolError> {
        let program = self.tools.tesseract.clone();
        let args: Vec<OsString> = vec![
            image.into(),
            "stdout".into(),
            "-l".into(),
            self.ocr_language.clone().into(),
        ];
        let output = run_tool(Command::new(&program), &program, &args, timeout).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn render_document(&self, source: &Path, out_dir: &Path) -> Result<(), ToolError> {
        let program = self.tools.soffice.clone();
        if !binary_exists(&program) {
            return Err(ToolError::NotFound { program });
        }
        let args: Vec<OsString> = vec![
            "--headless".into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            out_dir.into(),
            source.into(),
        ];
        let output = run_tool(Command::new(&program), &program, &args, self.timeout).await?;
        debug!(
            "soffice stdout: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn merge(&self, parts: &[PathBuf], output: &Path) -> Result<(), ToolError> {
        let program = self.tools.pdfunite();
        let mut args: Vec<OsString> = parts.iter().map(|p| p.as_os_str().to_owned()).collect();
        args.push(output.into());
        run_tool(self.poppler_command(&program), &program, &args, self.timeout).await?;
        Ok(())
    }
}

/// Spawn `cmd` with `args`, wait at most `timeout`, and require a zero exit.
pub(crate) async fn run_tool(
    mut cmd: Command,
    program: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<Output, ToolError> {
    debug!("Running: {} {:?}", program.display(), args);

    let child = cmd
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::NotFound {
                    program: program.to_path_buf(),
                }
            } else {
                ToolError::Spawn {
                    program: program.to_path_buf(),
                    source: e,
                }
            }
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| ToolError::Io {
            program: program.to_path_buf(),
            source: e,
        })?,
        Err(_) => {
            return Err(ToolError::Timeout {
                program: program.to_path_buf(),
                secs: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        return Err(ToolError::Exit {
            program: program.to_path_buf(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

/// `true` if `program` is an existing file, or a bare name found on `PATH`.
pub fn binary_exists(program: &Path) -> bool {
    if !ToolPaths::is_bare_command(program) {
        return program.is_file();
    }
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return true;
        }
        let suffix = std::env::consts::EXE_SUFFIX;
        !suffix.is_empty() && dir.join(format!("{}{suffix}", program.display())).is_file()
    })
}
