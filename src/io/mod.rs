//! Artifact persistence.
//!
//! - model checkpoints (`checkpoint`)
//! - the verification record for the proof system (`verification`)
//!
//! Both writers create missing parent directories and overwrite whatever is at
//! the target path. Writes are not atomic.

use std::fs::create_dir_all;
use std::path::Path;

use crate::error::AppError;

pub mod checkpoint;
pub mod verification;

pub use checkpoint::*;
pub use verification::*;

fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => create_dir_all(dir)
            .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", dir.display()))),
        _ => Ok(()),
    }
}
