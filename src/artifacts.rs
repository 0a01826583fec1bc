//! Per-run scratch space and unconditional cleanup of intermediate files.
//!
//! Every run owns one uniquely named directory (`pdf-rewrite-XXXXXX`) under
//! the configured work dir, so concurrent runs can never collide on a file
//! name. Inside it the pipeline writes the wrapper HTML, the rendered PDF,
//! the spliced tail, OCR page images, and the staged merge output; each is
//! registered with [`RunArtifacts::track`] in creation order.
//!
//! [`RunArtifacts::cleanup`] removes every tracked path and then the
//! directory itself. Failures are logged and counted, never propagated: a
//! stale temp file must not turn a successful run into a failed one. If the
//! run future is dropped mid-flight (the caller went away), `Drop` performs
//! the same cleanup.

use crate::error::RewriteError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Intermediate artifacts of a single pipeline run.
#[derive(Debug)]
pub struct RunArtifacts {
    dir: Option<TempDir>,
    root: PathBuf,
    tracked: Vec<PathBuf>,
}

impl RunArtifacts {
    /// Create a fresh, uniquely named run directory inside `work_dir`.
    pub fn create(work_dir: &Path) -> Result<Self, RewriteError> {
        let dir = tempfile::Builder::new()
            .prefix("pdf-rewrite-")
            .tempdir_in(work_dir)
            .map_err(|e| {
                RewriteError::Internal(format!(
                    "cannot create run directory in '{}': {e}",
                    work_dir.display()
                ))
            })?;
        let root = dir.path().to_path_buf();
        debug!("Run directory: {}", root.display());
        Ok(Self {
            dir: Some(dir),
            root,
            tracked: Vec::new(),
        })
    }

    /// The run directory.
    pub fn dir(&self) -> &Path {
        &self.root
    }

    /// Path of a (not yet created) file inside the run directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Register a path for removal at cleanup. Registering before the file
    /// exists is fine; missing files are skipped silently.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.tracked.contains(&path) {
            self.tracked.push(path);
        }
    }

    /// Tracked paths in registration order.
    pub fn tracked(&self) -> &[PathBuf] {
        &self.tracked
    }

    pub fn is_cleaned(&self) -> bool {
        self.dir.is_none()
    }

    /// Remove every tracked path, then the run directory.
    ///
    /// Returns the number of paths that could not be removed. Calling it a
    /// second time is a no-op.
    pub fn cleanup(&mut self) -> usize {
        let Some(dir) = self.dir.take() else {
            return 0;
        };

        let mut failures = 0;
        for path in self.tracked.drain(..) {
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    failures += 1;
                    warn!("Failed to delete temp file {}: {}", path.display(), e);
                }
            }
        }

        if let Err(e) = dir.close() {
            failures += 1;
            warn!("Failed to delete run directory {}: {}", self.root.display(), e);
        }
        failures
    }
}

impl Drop for RunArtifacts {
    fn drop(&mut self) {
        if !self.is_cleaned() {
            debug!("Run dropped before cleanup; removing artifacts");
            self.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn cleanup_removes_tracked_files_and_dir() {
        let work = tempfile::tempdir().unwrap();
        let mut run = RunArtifacts::create(work.path()).unwrap();

        let html = run.path("rewritten.html");
        std::fs::write(&html, "<p>hi</p>").unwrap();
        run.track(&html);

        let pages = run.path("pages");
        std::fs::create_dir(&pages).unwrap();
        std::fs::write(pages.join("page-1.png"), b"png").unwrap();
        run.track(&pages);

        // Registered but never created.
        run.track(run.path("rewritten.pdf"));

        assert_eq!(run.cleanup(), 0);
        assert!(!html.exists());
        assert_eq!(entries(work.path()), 0);
        assert!(run.is_cleaned());
        assert_eq!(run.cleanup(), 0);
    }

    #[test]
    fn drop_cleans_up() {
        let work = tempfile::tempdir().unwrap();
        {
            let mut run = RunArtifacts::create(work.path()).unwrap();
            let f = run.path("tail.pdf");
            std::fs::write(&f, b"%PDF-1.5").unwrap();
            run.track(f);
        }
        assert_eq!(entries(work.path()), 0);
    }

    #[test]
    fn concurrent_runs_get_distinct_dirs() {
        let work = tempfile::tempdir().unwrap();
        let a = RunArtifacts::create(work.path()).unwrap();
        let b = RunArtifacts::create(work.path()).unwrap();
        assert_ne!(a.dir(), b.dir());
        assert_ne!(a.path("rewritten.html"), b.path("rewritten.html"));
    }

    #[test]
    fn tracking_is_ordered_and_deduplicated() {
        let work = tempfile::tempdir().unwrap();
        let mut run = RunArtifacts::create(work.path()).unwrap();
        run.track(run.path("a"));
        run.track(run.path("b"));
        run.track(run.path("a"));
        let names: Vec<_> = run
            .tracked()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn create_fails_for_missing_work_dir() {
        let err = RunArtifacts::create(Path::new("/definitely/not/a/dir")).unwrap_err();
        assert!(matches!(err, RewriteError::Internal(_)));
    }
}
