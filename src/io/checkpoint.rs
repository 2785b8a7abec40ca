//! Read/write model checkpoints.
//!
//! A checkpoint is a bincode-encoded [`ModelCheckpoint`]: the full regressor
//! (architecture + weights) plus a format version, save time, the asset whose
//! yields trained it and the window length it expects. The encoding
//! stores every `f64` bit-for-bit, so a reloaded model reproduces predictions
//! exactly, NaN weights included.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::io::ensure_parent_dir;
use crate::models::YieldRegressor;

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub asset_id: String,
    pub seq_len: usize,
    pub model: YieldRegressor,
}

/// Write `model`, trained on `asset_id` yields, to `path`, replacing any existing checkpoint.
pub fn save_model(model: &YieldRegressor, asset_id: &str, path: &Path) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create checkpoint '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    let checkpoint = ModelCheckpoint {
        format_version: CHECKPOINT_FORMAT_VERSION,
        saved_at: Utc::now(),
        asset_id: asset_id.to_string(),
        seq_len: model.config().seq_len,
        model: model.clone(),
    };
    bincode::serialize_into(&mut writer, &checkpoint)
        .map_err(|e| AppError::io(format!("Failed to write checkpoint: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write checkpoint: {e}")))?;

    info!(path = %path.display(), asset_id, "model saved");
    Ok(())
}

/// Read a checkpoint written by [`save_model`].
pub fn load_checkpoint(path: &Path) -> Result<ModelCheckpoint, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open checkpoint '{}': {e}", path.display())))?;
    let checkpoint: ModelCheckpoint = bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| AppError::io(format!("Invalid checkpoint '{}': {e}", path.display())))?;

    if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
        return Err(AppError::io(format!(
            "Unsupported checkpoint format version {} (expected {CHECKPOINT_FORMAT_VERSION}).",
            checkpoint.format_version
        )));
    }
    if checkpoint.seq_len != checkpoint.model.config().seq_len {
        return Err(AppError::io(format!(
            "Checkpoint '{}' records seq_len {} but its model expects {}.",
            path.display(),
            checkpoint.seq_len,
            checkpoint.model.config().seq_len
        )));
    }
    Ok(checkpoint)
}

pub fn load_model(path: &Path) -> Result<YieldRegressor, AppError> {
    load_checkpoint(path).map(|c| c.model)
}
