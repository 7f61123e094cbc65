//! Shared timestamp/event helpers.

use crate::core::error;
use chrono::{Local, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use ulid::Ulid;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Local wall-clock date and minute, the way an auditor reads them off the device.
pub fn local_now() -> (NaiveDate, NaiveTime) {
    let now = Local::now().naive_local();
    let time = now
        .time()
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now.time());
    (now.date(), time)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, error::AuditError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        error::AuditError::Validation(format!("invalid date '{}' (expected YYYY-MM-DD): {}", raw, e))
    })
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, error::AuditError> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|e| {
        error::AuditError::Validation(format!("invalid time '{}' (expected HH:MM): {}", raw, e))
    })
}

/// Append one serialized event as a JSON line.
pub fn append_jsonl<T: Serialize>(path: &Path, event: &T) -> Result<(), error::AuditError> {
    let line = serde_json::to_string(event)?;
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(error::AuditError::IoError)?;
    writeln!(f, "{}", line).map_err(error::AuditError::IoError)
}

/// Standard command response envelope shape used by `--format json` outputs.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
