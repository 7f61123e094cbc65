//! Completion and validation state derived from (rubric, answers).
//!
//! Everything here is a pure function: nothing in this module mutates a session. The
//! session calls into it and applies the consequences itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::rubric::{Rubric, RubricSection};
use crate::audit::session::{AnswerMap, SessionHeader};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HeaderField {
    Store,
    Manager,
    Auditor,
}

impl HeaderField {
    pub fn as_str(self) -> &'static str {
        match self {
            HeaderField::Store => "store",
            HeaderField::Manager => "manager",
            HeaderField::Auditor => "auditor",
        }
    }

    pub fn join(fields: &[HeaderField]) -> String {
        fields
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Pending,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionProgress {
    pub section_id: u32,
    pub title: String,
    pub answered: usize,
    pub total: usize,
    pub status: SectionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub total_questions: usize,
    pub answered: usize,
    pub percentage: u8,
    pub sections: Vec<SectionProgress>,
}

impl Progress {
    pub fn remaining(&self) -> usize {
        self.total_questions - self.answered
    }

    pub fn is_complete(&self) -> bool {
        self.answered == self.total_questions
    }
}

fn is_answered(answers: &AnswerMap, question_id: &str) -> bool {
    answers.get(question_id).is_some_and(|a| a.score > 0)
}

fn answered_in(section: &RubricSection, answers: &AnswerMap) -> usize {
    section
        .questions
        .iter()
        .filter(|q| is_answered(answers, &q.id))
        .count()
}

/// Questions with a non-zero score. An explicit 0 counts as unanswered.
pub fn answered_count(rubric: &Rubric, answers: &AnswerMap) -> usize {
    rubric
        .questions()
        .filter(|q| is_answered(answers, &q.id))
        .count()
}

pub fn percentage(answered: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((answered as f64 / total as f64) * 100.0).round() as u8
}

pub fn section_status(
    section: &RubricSection,
    answers: &AnswerMap,
    show_errors: bool,
) -> SectionStatus {
    if answered_in(section, answers) == section.questions.len() {
        SectionStatus::Completed
    } else if show_errors {
        SectionStatus::Error
    } else {
        SectionStatus::Pending
    }
}

pub fn compute_progress(rubric: &Rubric, answers: &AnswerMap, show_errors: bool) -> Progress {
    let total_questions = rubric.question_count();
    let answered = answered_count(rubric, answers);
    let sections = rubric
        .sections()
        .iter()
        .map(|s| SectionProgress {
            section_id: s.id,
            title: s.title.clone(),
            answered: answered_in(s, answers),
            total: s.questions.len(),
            status: section_status(s, answers, show_errors),
        })
        .collect();
    Progress {
        total_questions,
        answered,
        percentage: percentage(answered, total_questions),
        sections,
    }
}

/// Header selections still empty, in header order.
pub fn missing_header_fields(header: &SessionHeader) -> Vec<HeaderField> {
    let mut missing = Vec::new();
    if header.store.is_none() {
        missing.push(HeaderField::Store);
    }
    if header.manager.is_none() {
        missing.push(HeaderField::Manager);
    }
    if header.auditor.is_none() {
        missing.push(HeaderField::Auditor);
    }
    missing
}

/// Unanswered question ids, in rubric order.
pub fn unanswered_questions(rubric: &Rubric, answers: &AnswerMap) -> Vec<String> {
    rubric
        .questions()
        .filter(|q| !is_answered(answers, &q.id))
        .map(|q| q.id.clone())
        .collect()
}

/// First section in rubric order with an unanswered question, plus that section's gaps.
pub fn first_incomplete_section(
    rubric: &Rubric,
    answers: &AnswerMap,
) -> Option<(u32, Vec<String>)> {
    rubric.sections().iter().find_map(|s| {
        let missing: Vec<String> = s
            .questions
            .iter()
            .filter(|q| !is_answered(answers, &q.id))
            .map(|q| q.id.clone())
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some((s.id, missing))
        }
    })
}

/// Submit eligibility: every header selection made and every question scored.
pub fn is_submit_eligible(rubric: &Rubric, header: &SessionHeader, answers: &AnswerMap) -> bool {
    missing_header_fields(header).is_empty() && first_incomplete_section(rubric, answers).is_none()
}
