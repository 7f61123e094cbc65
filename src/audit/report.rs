//! Report view derived from a finalized record.
//!
//! The view is plain data: findings are already selected, ordered and capped, so any
//! renderer (the text layout below, JSON, a PDF tool) only has to lay it out.

use serde::Serialize;
use std::fmt::Write as _;

use crate::audit::findings::{self, Finding};
use crate::audit::record::FinalizedAuditRecord;
use crate::audit::rubric::Rubric;
use crate::audit::scoring::AuditStatus;
use crate::core::time::{DATE_FORMAT, TIME_FORMAT};

pub const NO_FINDINGS_MESSAGE: &str =
    "No findings recorded: every criterion met the standard and no observations were noted.";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FindingsBlock {
    Listed {
        findings: Vec<Finding>,
        /// Findings left out of the body; 0 when everything fits.
        overflow: usize,
    },
    Clear {
        message: String,
    },
}

impl FindingsBlock {
    pub fn overflow_note(&self) -> Option<String> {
        match self {
            FindingsBlock::Listed { overflow, .. } if *overflow > 0 => {
                Some(format!("... {} more findings recorded", overflow))
            }
            _ => None,
        }
    }

    pub fn shown(&self) -> &[Finding] {
        match self {
            FindingsBlock::Listed { findings, .. } => findings,
            FindingsBlock::Clear { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportView {
    pub folio: String,
    pub store: String,
    pub manager: String,
    pub auditor: String,
    pub date: String,
    pub time: String,
    pub total_score: u32,
    pub status: AuditStatus,
    pub status_label: String,
    pub action_plan: Option<String>,
    pub findings: FindingsBlock,
    pub manager_signed: bool,
    pub auditor_signed: bool,
}

/// Build the report for `record`, showing at most `max_findings` findings.
pub fn build_report(
    record: &FinalizedAuditRecord,
    rubric: &Rubric,
    max_findings: usize,
) -> ReportView {
    let mut all = findings::findings(rubric, record.answers());
    let block = if all.is_empty() {
        FindingsBlock::Clear {
            message: NO_FINDINGS_MESSAGE.to_string(),
        }
    } else {
        let overflow = all.len().saturating_sub(max_findings);
        all.truncate(max_findings);
        FindingsBlock::Listed {
            findings: all,
            overflow,
        }
    };

    ReportView {
        folio: record.folio().to_string(),
        store: record.store().name.clone(),
        manager: record.manager().name.clone(),
        auditor: record.auditor().name.clone(),
        date: record.date().format(DATE_FORMAT).to_string(),
        time: record.time().format(TIME_FORMAT).to_string(),
        total_score: record.total_score(),
        status: record.status(),
        status_label: record.status().label().to_string(),
        action_plan: record.action_plan().map(str::to_string),
        findings: block,
        manager_signed: !record.manager_signature().svg_path().is_empty(),
        auditor_signed: !record.auditor_signature().svg_path().is_empty(),
    }
}

fn signed_mark(signed: bool) -> &'static str {
    if signed { "[signed]" } else { "[missing]" }
}

impl ReportView {
    /// Fixed-layout plain text rendering.
    pub fn render_text(&self) -> String {
        let rule = "=".repeat(64);
        let thin = "-".repeat(64);
        let mut out = String::new();
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "STORE AUDIT REPORT                       Folio: {}", self.folio);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Store:    {}", self.store);
        let _ = writeln!(out, "Manager:  {}", self.manager);
        let _ = writeln!(out, "Auditor:  {}", self.auditor);
        let _ = writeln!(out, "Date:     {} {}", self.date, self.time);
        let _ = writeln!(out, "{}", thin);
        let _ = writeln!(out, "Total score: {}/100    Status: {}", self.total_score, self.status_label);
        let _ = writeln!(out, "{}", thin);
        let _ = writeln!(out, "Findings");
        match &self.findings {
            FindingsBlock::Clear { message } => {
                let _ = writeln!(out, "  {}", message);
            }
            FindingsBlock::Listed { findings, .. } => {
                for f in findings {
                    let _ = writeln!(
                        out,
                        "  [{}] {} {} ({}/{}) {}",
                        f.severity(),
                        f.question_id,
                        f.category,
                        f.score,
                        f.max_points,
                        f.criterion
                    );
                    if let Some(obs) = &f.observation {
                        let _ = writeln!(out, "      Observation: {}", obs);
                    }
                }
                if let Some(note) = self.findings.overflow_note() {
                    let _ = writeln!(out, "  {}", note);
                }
            }
        }
        if let Some(plan) = &self.action_plan {
            let _ = writeln!(out, "{}", thin);
            let _ = writeln!(out, "Action plan");
            for line in plan.lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
        let _ = writeln!(out, "{}", thin);
        let _ = writeln!(
            out,
            "Manager signature {}    Auditor signature {}",
            signed_mark(self.manager_signed),
            signed_mark(self.auditor_signed)
        );
        let _ = write!(out, "{}", rule);
        out
    }
}

/// Short text suitable for a chat message.
pub fn share_summary(record: &FinalizedAuditRecord) -> String {
    format!(
        "Store audit {}\nStore: {}\nDate: {}\nScore: {}/100\nStatus: {}",
        record.folio(),
        record.store().name,
        record.date().format(DATE_FORMAT),
        record.total_score(),
        record.status().label()
    )
}
