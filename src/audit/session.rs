//! The in-memory audit being filled out.
//!
//! An [`AuditSession`] is created when an audit starts, mutated through scoring and
//! observation events, and consumed exactly once when the second signature is
//! confirmed. Dropping it is how an audit is cancelled.

use chrono::{NaiveDate, NaiveTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::audit::directory::{MasterDirectory, PersonRole};
use crate::audit::folio::Folio;
use crate::audit::progress::{self, HeaderField, Progress};
use crate::audit::record::FinalizedAuditRecord;
use crate::audit::rubric::Rubric;
use crate::audit::scoring;
use crate::audit::signature::{SequencerState, SignatureSequencer};
use crate::core::error::AuditError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: String,
    /// 0 while unanswered, otherwise one of the question's option values.
    pub score: u32,
    #[serde(default)]
    pub observation: String,
}

impl AnswerRecord {
    pub fn scored(question_id: &str, score: u32) -> Self {
        Self {
            question_id: question_id.to_string(),
            score,
            observation: String::new(),
        }
    }

    pub fn observed(question_id: &str, observation: &str) -> Self {
        Self {
            question_id: question_id.to_string(),
            score: 0,
            observation: observation.to_string(),
        }
    }

    pub fn has_observation(&self) -> bool {
        !self.observation.trim().is_empty()
    }
}

/// Answers keyed by question id.
pub type AnswerMap = BTreeMap<String, AnswerRecord>;

/// A header selection: the persisted id plus the name shown on reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selection {
    pub id: String,
    pub name: String,
}

impl Selection {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionHeader {
    pub store: Option<Selection>,
    pub manager: Option<Selection>,
    pub auditor: Option<Selection>,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Result of confirming a signature.
#[derive(Debug)]
pub enum SignOff {
    /// The manager signed; the surface is blank and waiting for the auditor.
    Pending(AuditSession),
    /// The auditor signed; the session has been consumed into its final record.
    Finalized(FinalizedAuditRecord),
}

/// A rejected sign-off hands the untouched session back with the reason.
#[derive(Debug)]
pub struct SessionRejected {
    pub session: AuditSession,
    pub error: AuditError,
}

#[derive(Debug, Clone)]
pub struct AuditSession {
    folio: Folio,
    header: SessionHeader,
    answers: AnswerMap,
    active_section: u32,
    show_validation_errors: bool,
    signing: Option<SignatureSequencer>,
}

fn to_selection(id: &str, name: &str) -> Option<Selection> {
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(Selection::new(id, name.trim()))
    }
}

impl AuditSession {
    /// Start a new audit dated `date`/`time`. The folio is drawn here and never again.
    pub fn start<R: Rng>(rubric: &Rubric, date: NaiveDate, time: NaiveTime, rng: &mut R) -> Self {
        let folio = Folio::generate(date, rng);
        tracing::debug!(folio = %folio, "audit session started");
        Self {
            folio,
            header: SessionHeader {
                date,
                time,
                ..SessionHeader::default()
            },
            answers: AnswerMap::new(),
            active_section: rubric.first_section_id().unwrap_or_default(),
            show_validation_errors: false,
            signing: None,
        }
    }

    pub fn folio(&self) -> &Folio {
        &self.folio
    }

    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answer(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.answers.get(question_id)
    }

    pub fn active_section(&self) -> u32 {
        self.active_section
    }

    pub fn show_validation_errors(&self) -> bool {
        self.show_validation_errors
    }

    pub fn is_signing(&self) -> bool {
        self.signing.is_some()
    }

    pub fn signing(&self) -> Option<&SignatureSequencer> {
        self.signing.as_ref()
    }

    pub fn signing_mut(&mut self) -> Option<&mut SignatureSequencer> {
        self.signing.as_mut()
    }

    fn ensure_editable(&self) -> Result<(), AuditError> {
        if self.signing.is_some() {
            Err(AuditError::SessionLocked)
        } else {
            Ok(())
        }
    }

    /// Select the store; an empty id clears the selection.
    pub fn select_store(&mut self, id: &str, name: &str) -> Result<(), AuditError> {
        self.ensure_editable()?;
        self.header.store = to_selection(id, name);
        Ok(())
    }

    pub fn select_manager(&mut self, id: &str, name: &str) -> Result<(), AuditError> {
        self.ensure_editable()?;
        self.header.manager = to_selection(id, name);
        Ok(())
    }

    pub fn select_auditor(&mut self, id: &str, name: &str) -> Result<(), AuditError> {
        self.ensure_editable()?;
        self.header.auditor = to_selection(id, name);
        Ok(())
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<(), AuditError> {
        self.ensure_editable()?;
        self.header.date = date;
        Ok(())
    }

    pub fn set_time(&mut self, time: NaiveTime) -> Result<(), AuditError> {
        self.ensure_editable()?;
        self.header.time = time;
        Ok(())
    }

    /// Record a score. `0` resets the question to unanswered; any other value must be
    /// one of the question's options. The observation is kept.
    pub fn set_score(
        &mut self,
        rubric: &Rubric,
        question_id: &str,
        score: u32,
    ) -> Result<(), AuditError> {
        self.ensure_editable()?;
        let question = rubric
            .question(question_id)
            .ok_or_else(|| AuditError::UnknownQuestion(question_id.to_string()))?;
        if score != 0 && !question.allows(score) {
            return Err(AuditError::InvalidScore {
                question_id: question_id.to_string(),
                score,
                allowed: question.option_values(),
            });
        }
        self.answers
            .entry(question_id.to_string())
            .or_insert_with(|| AnswerRecord::scored(question_id, 0))
            .score = score;
        Ok(())
    }

    /// Record free text for a question. The score is kept (0 if never scored).
    pub fn set_observation(
        &mut self,
        rubric: &Rubric,
        question_id: &str,
        text: &str,
    ) -> Result<(), AuditError> {
        self.ensure_editable()?;
        if rubric.question(question_id).is_none() {
            return Err(AuditError::UnknownQuestion(question_id.to_string()));
        }
        self.answers
            .entry(question_id.to_string())
            .or_insert_with(|| AnswerRecord::scored(question_id, 0))
            .observation = text.to_string();
        Ok(())
    }

    /// Navigation is allowed at any time, including while signing.
    pub fn set_active_section(&mut self, rubric: &Rubric, section_id: u32) -> Result<(), AuditError> {
        if rubric.section(section_id).is_none() {
            return Err(AuditError::UnknownSection(section_id));
        }
        self.active_section = section_id;
        Ok(())
    }

    pub fn progress(&self, rubric: &Rubric) -> Progress {
        progress::compute_progress(rubric, &self.answers, self.show_validation_errors)
    }

    /// Running total shown while editing. Derived on every call, never stored.
    pub fn running_total(&self) -> u32 {
        scoring::total_score(&self.answers)
    }

    /// Submit intent: validate and, if everything is in order, start signature capture.
    ///
    /// - Missing header selections: `HeaderIncomplete`, nothing else changes.
    /// - Unanswered questions: the validation flag is raised and the active section
    ///   jumps to the first incomplete section before `AnswersIncomplete` is returned.
    /// - Selections unknown to `directory`: `UnknownIdentity`, nothing changes.
    pub fn request_submit(
        &mut self,
        rubric: &Rubric,
        directory: &MasterDirectory,
    ) -> Result<(), AuditError> {
        self.ensure_editable()?;

        let missing = progress::missing_header_fields(&self.header);
        if !missing.is_empty() {
            return Err(AuditError::HeaderIncomplete(missing));
        }

        if let Some((section, missing)) = progress::first_incomplete_section(rubric, &self.answers)
        {
            self.show_validation_errors = true;
            self.active_section = section;
            return Err(AuditError::AnswersIncomplete { section, missing });
        }

        self.verify_identities(directory)?;

        self.signing = Some(SignatureSequencer::new());
        tracing::debug!(folio = %self.folio, "signature capture started");
        Ok(())
    }

    fn verify_identities(&self, directory: &MasterDirectory) -> Result<(), AuditError> {
        if let Some(store) = &self.header.store {
            if directory.store(&store.id).is_none() {
                return Err(AuditError::UnknownIdentity {
                    field: HeaderField::Store,
                    id: store.id.clone(),
                    remediation: "register the store in the master list (`storeaudit master store add`) and select it again".to_string(),
                });
            }
        }
        let people = [
            (HeaderField::Manager, PersonRole::Manager, &self.header.manager),
            (HeaderField::Auditor, PersonRole::Auditor, &self.header.auditor),
        ];
        for (field, role, selection) in people {
            if let Some(sel) = selection {
                if directory.person(&sel.id, role).is_none() {
                    return Err(AuditError::UnknownIdentity {
                        field,
                        id: sel.id.clone(),
                        remediation: format!(
                            "register the person as '{}' in the master list (`storeaudit master person add`) and select them again",
                            role
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Abort signature capture. Partial signatures are discarded; answers are kept.
    pub fn cancel_signing(&mut self) {
        if self.signing.take().is_some() {
            tracing::debug!(folio = %self.folio, "signature capture cancelled");
        }
    }

    /// Confirm the ink on the capture surface for whoever is signing now.
    ///
    /// After the manager signs the session comes back as [`SignOff::Pending`] with a
    /// blank surface. After the auditor signs the session is finalized on the spot and
    /// consumed. On rejection the session is returned unchanged inside the error.
    pub fn confirm_signature(mut self) -> Result<SignOff, Box<SessionRejected>> {
        let submitted = match self.signing.as_mut() {
            Some(sequencer) => sequencer.submit(),
            None => Err(AuditError::SigningNotStarted),
        };
        match submitted {
            Ok(SequencerState::Done) => {}
            Ok(_) => return Ok(SignOff::Pending(self)),
            Err(error) => {
                return Err(Box::new(SessionRejected {
                    session: self,
                    error,
                }));
            }
        }

        let Some((manager, auditor)) = self.signing.take().and_then(|s| s.into_signatures())
        else {
            return Err(Box::new(SessionRejected {
                session: self,
                error: AuditError::SigningNotStarted,
            }));
        };
        let record =
            FinalizedAuditRecord::from_session(self.folio, self.header, self.answers, manager, auditor);
        tracing::info!(
            folio = %record.folio(),
            total = record.total_score(),
            status = %record.status(),
            "audit finalized"
        );
        Ok(SignOff::Finalized(record))
    }
}
