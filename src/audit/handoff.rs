//! Two-phase handoff of a finalized record to persistence.
//!
//! The record exists before any save is tried, so a failing store can never lose it:
//! the handoff keeps the record, remembers why the save failed and can be retried.

use serde::Serialize;

use crate::audit::record::FinalizedAuditRecord;
use crate::core::error::AuditError;

/// Anything that can durably store a finalized audit.
pub trait AuditRepository {
    /// Insert or replace the audit with this record's folio. Returns the permanent id.
    fn upsert_audit(&self, record: &FinalizedAuditRecord) -> Result<String, AuditError>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PersistenceState {
    Pending,
    Saved { id: String },
    NotSaved { reason: String },
}

#[derive(Debug, Clone)]
pub struct Handoff {
    record: FinalizedAuditRecord,
    state: PersistenceState,
    attempts: u32,
}

impl Handoff {
    pub fn new(record: FinalizedAuditRecord) -> Self {
        Self {
            record,
            state: PersistenceState::Pending,
            attempts: 0,
        }
    }

    pub fn record(&self) -> &FinalizedAuditRecord {
        &self.record
    }

    pub fn state(&self) -> &PersistenceState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_saved(&self) -> bool {
        matches!(self.state, PersistenceState::Saved { .. })
    }

    pub fn saved_id(&self) -> Option<&str> {
        match &self.state {
            PersistenceState::Saved { id } => Some(id),
            _ => None,
        }
    }

    /// Try to save. Never fails: the outcome lands in [`Handoff::state`].
    pub fn attempt(&mut self, repo: &dyn AuditRepository) -> &PersistenceState {
        self.attempts += 1;
        self.state = match repo.upsert_audit(&self.record) {
            Ok(id) => {
                tracing::info!(folio = %self.record.folio(), id = %id, "audit saved");
                PersistenceState::Saved { id }
            }
            Err(e) => {
                tracing::warn!(
                    folio = %self.record.folio(),
                    attempt = self.attempts,
                    error = %e,
                    "audit not saved; record kept for retry"
                );
                PersistenceState::NotSaved {
                    reason: e.to_string(),
                }
            }
        };
        &self.state
    }

    /// Attach an action plan drafted after the first attempt. The save state is kept;
    /// a saved handoff needs the plan written to storage separately.
    pub fn attach_action_plan(&mut self, plan: &str) {
        self.record.set_action_plan(plan);
    }

    pub fn into_record(self) -> FinalizedAuditRecord {
        self.record
    }
}
