//! Read/write the verification record consumed by the proof system.
//!
//! Schema: `{"input": [f64; seq_len], "prediction": f64}`. JSON cannot represent
//! NaN or infinity, so a non-finite prediction is written as `null`; the key and
//! the array length stay the same either way.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::domain::VerificationRecord;
use crate::error::AppError;
use crate::io::ensure_parent_dir;

/// Write the freshest window and its prediction to `path`, replacing any existing file.
pub fn save_verification(window: &[f64], prediction: f64, path: &Path) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create verification file '{}': {e}", path.display()))
    })?;
    let mut writer = BufWriter::new(file);

    let record = VerificationRecord {
        input: window.to_vec(),
        prediction,
    };
    serde_json::to_writer(&mut writer, &record)
        .map_err(|e| AppError::io(format!("Failed to write verification file: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write verification file: {e}")))?;

    info!(path = %path.display(), inputs = window.len(), "verification data saved");
    Ok(())
}

pub fn read_verification(path: &Path) -> Result<VerificationRecord, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::io(format!("Failed to open verification file '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid verification file: {e}")))
}
