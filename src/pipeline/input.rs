//! Input validation: make sure the caller handed us a readable PDF.
//!
//! Checking existence, permissions, and the `%PDF` magic bytes up front
//! gives callers a precise error instead of a generic "0 pages" from the
//! parser. The caller owns the input; this module never modifies it.

use crate::error::RewriteError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_input(path: &Path) -> Result<(), RewriteError> {
    if !path.exists() {
        return Err(RewriteError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(RewriteError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RewriteError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(RewriteError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(())
}
