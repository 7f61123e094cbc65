//! The immutable result of a completed audit.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::audit::folio::Folio;
use crate::audit::scoring::{self, AuditStatus};
use crate::audit::session::{AnswerMap, Selection, SessionHeader};
use crate::audit::signature::SignaturePayload;
use crate::core::error::AuditError;

/// A signed audit. Both signatures are always present; total and status are derived from
/// the answers at construction and cannot drift from them.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedAuditRecord {
    folio: Folio,
    store: Selection,
    manager: Selection,
    auditor: Selection,
    date: NaiveDate,
    time: NaiveTime,
    answers: AnswerMap,
    total_score: u32,
    status: AuditStatus,
    manager_signature: SignaturePayload,
    auditor_signature: SignaturePayload,
    action_plan: Option<String>,
}

/// Raw columns of a stored audit, as read back from persistence or a pending file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAudit {
    pub folio: String,
    pub store: Selection,
    pub manager: Selection,
    pub auditor: Selection,
    pub date: String,
    pub time: String,
    pub answers: AnswerMap,
    pub total_score: u32,
    pub manager_signature: String,
    pub auditor_signature: String,
    pub action_plan: Option<String>,
}

fn missing(field: &str) -> Selection {
    Selection::new("", field)
}

impl FinalizedAuditRecord {
    /// Seal a session. Only reachable from the sign-off path, which guarantees a
    /// complete header and two captured signatures.
    pub(crate) fn from_session(
        folio: Folio,
        header: SessionHeader,
        answers: AnswerMap,
        manager_signature: SignaturePayload,
        auditor_signature: SignaturePayload,
    ) -> Self {
        let total_score = scoring::total_score(&answers);
        Self {
            folio,
            store: header.store.unwrap_or_else(|| missing("store")),
            manager: header.manager.unwrap_or_else(|| missing("manager")),
            auditor: header.auditor.unwrap_or_else(|| missing("auditor")),
            date: header.date,
            time: header.time,
            answers,
            total_score,
            status: scoring::classify(total_score),
            manager_signature,
            auditor_signature,
            action_plan: None,
        }
    }

    /// Rebuild a record from storage. Signatures must be non-empty; total and status are
    /// recomputed from the answers and a disagreeing stored total is logged.
    pub fn restore(stored: StoredAudit) -> Result<Self, AuditError> {
        let folio = Folio::parse(&stored.folio)?;
        let date = crate::core::time::parse_date(&stored.date)?;
        let time = crate::core::time::parse_time(&stored.time)?;
        let manager_signature = SignaturePayload::from_svg_path(&stored.manager_signature)
            .map_err(|_| {
                AuditError::Persistence(format!("audit {} has no manager signature", folio))
            })?;
        let auditor_signature = SignaturePayload::from_svg_path(&stored.auditor_signature)
            .map_err(|_| {
                AuditError::Persistence(format!("audit {} has no auditor signature", folio))
            })?;

        let total_score = scoring::total_score(&stored.answers);
        if total_score != stored.total_score {
            tracing::warn!(
                folio = %folio,
                stored = stored.total_score,
                recomputed = total_score,
                "stored total disagrees with answers; using recomputed total"
            );
        }

        Ok(Self {
            folio,
            store: stored.store,
            manager: stored.manager,
            auditor: stored.auditor,
            date,
            time,
            answers: stored.answers,
            total_score,
            status: scoring::classify(total_score),
            manager_signature,
            auditor_signature,
            action_plan: stored.action_plan.filter(|p| !p.trim().is_empty()),
        })
    }

    pub fn folio(&self) -> &Folio {
        &self.folio
    }

    pub fn store(&self) -> &Selection {
        &self.store
    }

    pub fn manager(&self) -> &Selection {
        &self.manager
    }

    pub fn auditor(&self) -> &Selection {
        &self.auditor
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn status(&self) -> AuditStatus {
        self.status
    }

    pub fn manager_signature(&self) -> &SignaturePayload {
        &self.manager_signature
    }

    pub fn auditor_signature(&self) -> &SignaturePayload {
        &self.auditor_signature
    }

    pub fn action_plan(&self) -> Option<&str> {
        self.action_plan.as_deref()
    }

    /// Attach a drafted action plan. Blank text clears it.
    pub fn with_action_plan(mut self, plan: &str) -> Self {
        self.set_action_plan(plan);
        self
    }

    pub(crate) fn set_action_plan(&mut self, plan: &str) {
        let plan = plan.trim();
        self.action_plan = if plan.is_empty() {
            None
        } else {
            Some(plan.to_string())
        };
    }

    /// Flatten back to the stored columns; [`FinalizedAuditRecord::restore`] reverses it.
    pub fn to_stored(&self) -> StoredAudit {
        StoredAudit {
            folio: self.folio.as_str().to_string(),
            store: self.store.clone(),
            manager: self.manager.clone(),
            auditor: self.auditor.clone(),
            date: self.date.format(crate::core::time::DATE_FORMAT).to_string(),
            time: self.time.format(crate::core::time::TIME_FORMAT).to_string(),
            answers: self.answers.clone(),
            total_score: self.total_score,
            manager_signature: self.manager_signature.svg_path().to_string(),
            auditor_signature: self.auditor_signature.svg_path().to_string(),
            action_plan: self.action_plan.clone(),
        }
    }
}
