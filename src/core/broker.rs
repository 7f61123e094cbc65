use crate::core::db;
use crate::core::error;
use crate::core::schemas;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Serialized access point for every database operation.
///
/// Each call opens a connection, runs the closure under an in-process lock and appends
/// one line to `broker.events.jsonl` recording the operation and its outcome.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub subject: Option<String>,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join(schemas::BROKER_EVENTS_NAME),
        }
    }

    /// Execute a closure with a serialized connection to the specified DB.
    ///
    /// `subject` names the entity touched by the operation (a folio, a store id) so the
    /// event log can be filtered per record.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        subject: Option<&str>,
        op_name: &str,
        f: F,
    ) -> Result<R, error::AuditError>
    where
        F: FnOnce(&Connection) -> Result<R, error::AuditError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        let _lock = DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let conn = db::db_connect(&db_path.to_string_lossy())?;

        let result = f(&conn);

        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(actor, subject, op_name, &db_id, status)?;
        if let Err(e) = &result {
            tracing::debug!(op = op_name, db = %db_id, error = %e, "broker operation failed");
        }

        result
    }

    fn log_event(
        &self,
        actor: &str,
        subject: Option<&str>,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::AuditError> {
        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            subject: subject.map(|s| s.to_string()),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };
        time::append_jsonl(&self.audit_log_path, &ev)
    }
}

/// Read back the broker log, oldest first. A missing log is an empty history.
pub fn read_events(root: &Path) -> Result<Vec<BrokerEvent>, error::AuditError> {
    let path = root.join(schemas::BROKER_EVENTS_NAME);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path)?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(error::AuditError::JsonError))
        .collect()
}
