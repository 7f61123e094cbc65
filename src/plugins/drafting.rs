//! Action-plan drafting through an external program.
//!
//! The drafter is a collaborator, not part of the audit: it runs after the record is
//! sealed and any failure degrades to a fixed message the auditor can replace by hand.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::audit::findings::{self, Evidence};
use crate::audit::record::FinalizedAuditRecord;
use crate::audit::rubric::Rubric;
use crate::audit::scoring::AuditStatus;
use crate::core::config::DraftingConfig;
use crate::core::error::AuditError;
use crate::core::schemas;
use crate::core::time;

pub const CONGRATULATION_MESSAGE: &str = "Excellent execution. The store meets every operating standard evaluated. Recognize the team and keep the current level of supervision to stay consistent.";
pub const NOT_CONFIGURED_MESSAGE: &str =
    "The drafting service is not configured. Please draft the action plan manually.";
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Could not reach the drafting service. Try generating the plan again.";
pub const EMPTY_OUTPUT_MESSAGE: &str = "The action plan could not be generated automatically.";

const MISSING_OBSERVATION: &str =
    "NO OBSERVATION RECORDED BY THE AUDITOR (investigate root cause)";

/// Everything a drafter needs to write the plan.
#[derive(Debug, Clone, Serialize)]
pub struct DraftRequest {
    pub store_name: String,
    pub total_score: u32,
    pub status: AuditStatus,
    /// Worst first.
    pub evidence: Vec<Evidence>,
}

impl DraftRequest {
    pub fn from_record(record: &FinalizedAuditRecord, rubric: &Rubric) -> Self {
        Self {
            store_name: record.store().name.clone(),
            total_score: record.total_score(),
            status: record.status(),
            evidence: findings::evidence(rubric, record.answers()),
        }
    }

    pub fn prompt(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Write a concise, direct corrective action plan for the store \"{}\".",
            self.store_name
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Overview:");
        let _ = writeln!(out, "- Total score: {}/100", self.total_score);
        let _ = writeln!(out, "- Status: {}", self.status.label());
        let _ = writeln!(out);
        let _ = writeln!(out, "FINDINGS (ordered by priority):");
        for e in &self.evidence {
            let _ = writeln!(
                out,
                "[{}] {}: {} (scored {}/{}). Detail: {}",
                e.severity.as_str().to_uppercase(),
                e.category,
                e.criterion,
                e.score,
                e.max_points,
                e.observation.as_deref().unwrap_or(MISSING_OBSERVATION)
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Instructions:");
        let _ = writeln!(out, "1. Address [CRITICAL] and [ALERT] findings first.");
        let _ = writeln!(
            out,
            "2. Where no observation was recorded, include a step to find out why the point failed."
        );
        let _ = writeln!(out, "3. Give 3 to 5 corrective actions grouped by urgency.");
        let _ = writeln!(out, "4. Use imperative language and plain bullet points.");
        out
    }
}

pub trait ActionPlanDrafter {
    fn draft(&self, request: &DraftRequest) -> Result<String, AuditError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DraftingEvent {
    ts: String,
    event_id: String,
    command: String,
    args: Vec<String>,
    store: String,
    evidence: usize,
    status: String,
    exit_code: Option<i32>,
}

/// Runs `command args...`, feeds the prompt on stdin and takes stdout as the plan.
#[derive(Debug, Clone)]
pub struct CommandDrafter {
    command: String,
    args: Vec<String>,
    log_root: PathBuf,
}

impl CommandDrafter {
    pub fn new(command: &str, args: &[String], log_root: &Path) -> Self {
        Self {
            command: command.to_string(),
            args: args.to_vec(),
            log_root: log_root.to_path_buf(),
        }
    }

    /// Drafter for the configured command, if any.
    pub fn from_config(config: &DraftingConfig, log_root: &Path) -> Option<Self> {
        config
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| Self::new(c, &config.args, log_root))
    }

    fn log(&self, request: &DraftRequest, status: &str, exit_code: Option<i32>) {
        let event = DraftingEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            command: self.command.clone(),
            args: self.args.clone(),
            store: request.store_name.clone(),
            evidence: request.evidence.len(),
            status: status.to_string(),
            exit_code,
        };
        let path = self.log_root.join(schemas::DRAFTING_EVENTS_NAME);
        if let Err(e) = time::append_jsonl(&path, &event) {
            tracing::debug!(error = %e, "drafting event not logged");
        }
    }
}

impl ActionPlanDrafter for CommandDrafter {
    fn draft(&self, request: &DraftRequest) -> Result<String, AuditError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                self.log(request, "spawn_error", None);
                AuditError::Drafting(format!("cannot start '{}': {}", self.command, e))
            })?;

        // A program that exits without reading its input breaks the pipe; reap it and
        // log the run before reporting that.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(request.prompt().as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output().map_err(|e| {
            self.log(request, "wait_error", None);
            AuditError::Drafting(format!("'{}' did not finish: {}", self.command, e))
        })?;

        if let Err(e) = written {
            self.log(request, "write_error", output.status.code());
            return Err(AuditError::Drafting(format!(
                "'{}' did not accept the prompt: {}",
                self.command, e
            )));
        }
        if !output.status.success() {
            self.log(request, "error", output.status.code());
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuditError::Drafting(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        self.log(request, "success", output.status.code());
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Draft a plan for `record`. Never fails: every problem maps to a fixed message.
pub fn draft_action_plan(
    drafter: Option<&dyn ActionPlanDrafter>,
    record: &FinalizedAuditRecord,
    rubric: &Rubric,
) -> String {
    let request = DraftRequest::from_record(record, rubric);
    if request.evidence.is_empty() {
        return CONGRATULATION_MESSAGE.to_string();
    }
    let Some(drafter) = drafter else {
        tracing::warn!("no drafting command configured");
        return NOT_CONFIGURED_MESSAGE.to_string();
    };
    match drafter.draft(&request) {
        Ok(plan) if plan.trim().is_empty() => EMPTY_OUTPUT_MESSAGE.to_string(),
        Ok(plan) => plan.trim().to_string(),
        Err(e) => {
            tracing::warn!(folio = %record.folio(), error = %e, "action plan drafting failed");
            CONNECTION_ERROR_MESSAGE.to_string()
        }
    }
}
