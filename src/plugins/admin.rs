//! Admin console gate and history filtering.

use chrono::NaiveDate;
use serde::Serialize;

use crate::audit::record::FinalizedAuditRecord;
use crate::audit::scoring::AuditStatus;
use crate::core::config::AuditConfig;
use crate::core::error::AuditError;

/// Check an entered passphrase against the configured one. Exact match only.
pub fn authorize(config: &AuditConfig, entered: Option<&str>) -> Result<(), AuditError> {
    let expected = config.effective_passphrase();
    match entered {
        Some(given) if given == expected => Ok(()),
        Some(_) => {
            tracing::warn!("admin console: wrong passphrase");
            Err(AuditError::AccessDenied("incorrect passphrase".to_string()))
        }
        None => Err(AuditError::AccessDenied(
            "passphrase required (--passphrase)".to_string(),
        )),
    }
}

/// History filter: inclusive date range, store name substring, status.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct HistoryFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring of the store name.
    pub store: Option<String>,
    pub status: Option<AuditStatus>,
}

impl HistoryFilter {
    pub fn is_empty(&self) -> bool {
        self == &HistoryFilter::default()
    }

    pub fn matches(&self, record: &FinalizedAuditRecord) -> bool {
        if self.date_from.is_some_and(|from| record.date() < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| record.date() > to) {
            return false;
        }
        if let Some(needle) = self.store.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !record
                .store()
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        self.status.is_none_or(|s| s == record.status())
    }

    pub fn apply<'a>(
        &self,
        records: &'a [FinalizedAuditRecord],
    ) -> impl Iterator<Item = &'a FinalizedAuditRecord> + 'a {
        let filter = self.clone();
        records.iter().filter(move |r| filter.matches(r))
    }
}
