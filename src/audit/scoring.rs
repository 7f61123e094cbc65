//! Score totals and the three status tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audit::session::AnswerMap;
use crate::core::error::AuditError;

pub const MODEL_STORE_THRESHOLD: u32 = 95;
pub const ACCEPTABLE_THRESHOLD: u32 = 85;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    ModelStore,
    Acceptable,
    Critical,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::ModelStore => "MODEL_STORE",
            AuditStatus::Acceptable => "ACCEPTABLE",
            AuditStatus::Critical => "CRITICAL",
        }
    }

    /// Label printed on reports.
    pub fn label(self) -> &'static str {
        match self {
            AuditStatus::ModelStore => "MODEL STORE",
            AuditStatus::Acceptable => "ACCEPTABLE",
            AuditStatus::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "MODEL_STORE" => Ok(AuditStatus::ModelStore),
            "ACCEPTABLE" => Ok(AuditStatus::Acceptable),
            "CRITICAL" => Ok(AuditStatus::Critical),
            other => Err(AuditError::Validation(format!(
                "unknown status '{}' (expected MODEL_STORE, ACCEPTABLE or CRITICAL)",
                other
            ))),
        }
    }
}

/// Sum of every answer's score; unanswered entries contribute 0.
pub fn total_score(answers: &AnswerMap) -> u32 {
    answers.values().map(|a| a.score).sum()
}

/// Tier for a total, evaluated highest first with inclusive lower bounds.
pub fn classify(total: u32) -> AuditStatus {
    if total >= MODEL_STORE_THRESHOLD {
        AuditStatus::ModelStore
    } else if total >= ACCEPTABLE_THRESHOLD {
        AuditStatus::Acceptable
    } else {
        AuditStatus::Critical
    }
}
