//! Records that could not be saved, kept on disk until a retry succeeds.
//!
//! One pretty-printed JSON file per folio under `<data>/pending/`. The file holds the
//! stored columns of the record, so a retry rebuilds the exact record (same folio, same
//! signatures) and the upsert by folio stays idempotent.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audit::folio::Folio;
use crate::audit::record::{FinalizedAuditRecord, StoredAudit};
use crate::core::error::AuditError;

pub const PENDING_DIR_NAME: &str = "pending";

pub fn pending_dir(data_root: &Path) -> PathBuf {
    data_root.join(PENDING_DIR_NAME)
}

pub fn pending_path(data_root: &Path, folio: &Folio) -> PathBuf {
    pending_dir(data_root).join(format!("{}.json", folio))
}

/// Write (or overwrite) the pending file for `record`.
pub fn write_pending(
    data_root: &Path,
    record: &FinalizedAuditRecord,
) -> Result<PathBuf, AuditError> {
    let path = pending_path(data_root, record.folio());
    fs::create_dir_all(pending_dir(data_root))?;
    let bytes = serde_json::to_vec_pretty(&record.to_stored())?;
    fs::write(&path, bytes)?;
    tracing::info!(folio = %record.folio(), path = %path.display(), "record kept for retry");
    Ok(path)
}

pub fn load_pending(path: &Path) -> Result<FinalizedAuditRecord, AuditError> {
    let raw = fs::read_to_string(path)?;
    let stored: StoredAudit = serde_json::from_str(&raw).map_err(|e| {
        AuditError::Validation(format!("invalid pending audit {}: {}", path.display(), e))
    })?;
    FinalizedAuditRecord::restore(stored)
}

/// Pending files ordered by folio. A missing directory means nothing is pending.
pub fn list_pending(data_root: &Path) -> Result<Vec<PathBuf>, AuditError> {
    let dir = pending_dir(data_root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Drop the pending file once the record is saved. Already gone is fine.
pub fn clear_pending(path: &Path) -> Result<(), AuditError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
