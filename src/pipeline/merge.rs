//! Final assembly: rendered pages first, untouched tail second.
//!
//! The merged document is staged inside the run directory and only then
//! moved to the caller's output path, so a failed merge never leaves a
//! truncated file where the caller expects a result. Publishing is a rename
//! when source and destination share a filesystem, otherwise a copy to a
//! uniquely named temp file beside the output that is then persisted over
//! it. A lone part is always copied.

use crate::artifacts::RunArtifacts;
use crate::error::RewriteError;
use crate::pipeline::tools::Toolchain;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const MERGED_NAME: &str = "merged.pdf";

/// Produce the final document at `output` from `parts`, in order.
///
/// A single part is copied byte for byte; several are concatenated by the
/// toolchain's merger. Returns the size of the published file in bytes.
pub async fn merge_or_copy(
    tools: &dyn Toolchain,
    artifacts: &mut RunArtifacts,
    parts: &[PathBuf],
    output: &Path,
) -> Result<u64, RewriteError> {
    match parts {
        [] => Err(RewriteError::MergeFailed {
            parts: 0,
            detail: "nothing to merge".to_string(),
        }),
        [single] => {
            info!("Single part; copying {} to output", single.display());
            publish(single, output, false).await
        }
        _ => {
            let staged = artifacts.path(MERGED_NAME);
            artifacts.track(&staged);
            tools
                .merge(parts, &staged)
                .await
                .map_err(|e| RewriteError::MergeFailed {
                    parts: parts.len(),
                    detail: e.to_string(),
                })?;
            if !staged.is_file() {
                return Err(RewriteError::MergeFailed {
                    parts: parts.len(),
                    detail: format!("merger did not create '{}'", staged.display()),
                });
            }
            debug!("Merged {} parts into {}", parts.len(), staged.display());
            publish(&staged, output, true).await
        }
    }
}

/// Put `source` at `output`, replacing any existing file.
///
/// With `consume` the source may be moved; otherwise it is left in place.
/// Copies go through a uniquely named temp file next to `output`, removed
/// again if the copy fails or the future is dropped.
async fn publish(source: &Path, output: &Path, consume: bool) -> Result<u64, RewriteError> {
    let write_err = |e: std::io::Error| RewriteError::OutputWriteFailed {
        path: output.to_path_buf(),
        source: e,
    };

    let parent = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            parent
        }
        None => Path::new("."),
    };

    let moved = if consume {
        match tokio::fs::rename(source, output).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Rename failed ({}), copying instead", e);
                false
            }
        }
    } else {
        false
    };

    if !moved {
        let staged = tempfile::Builder::new()
            .prefix(".pdf-rewrite-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(write_err)?;
        tokio::fs::copy(source, staged.path())
            .await
            .map_err(write_err)?;
        staged.persist(output).map_err(|e| {
            warn!("Could not move {} into place", e.file.path().display());
            write_err(e.error)
        })?;
    }

    let size = tokio::fs::metadata(output).await.map_err(write_err)?.len();
    if size == 0 {
        let _ = tokio::fs::remove_file(output).await;
        return Err(RewriteError::OutputEmpty {
            path: output.to_path_buf(),
        });
    }
    info!("Wrote {} ({} bytes)", output.display(), size);
    Ok(size)
}
