//! Rubric definition: the fixed sections, questions and scoring options a store is
//! evaluated against.
//!
//! A [`Rubric`] is loaded once (from the embedded asset or a configured file), validated,
//! and then only ever borrowed. Nothing mutates it after [`Rubric::from_toml_str`].

use crate::core::assets;
use crate::core::error::AuditError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Points available across the whole rubric.
pub const RUBRIC_TOTAL_POINTS: u32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OptionTier {
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoringOption {
    pub label: String,
    pub value: u32,
    pub tier: OptionTier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RubricQuestion {
    pub id: String,
    pub category: String,
    pub criterion: String,
    pub max_points: u32,
    pub options: Vec<ScoringOption>,
}

impl RubricQuestion {
    pub fn allows(&self, score: u32) -> bool {
        self.options.iter().any(|o| o.value == score)
    }

    pub fn option_values(&self) -> Vec<u32> {
        self.options.iter().map(|o| o.value).collect()
    }

    pub fn option_for(&self, score: u32) -> Option<&ScoringOption> {
        self.options.iter().find(|o| o.value == score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RubricSection {
    pub id: u32,
    pub title: String,
    pub max_points: u32,
    pub questions: Vec<RubricQuestion>,
}

#[derive(Debug, Deserialize)]
struct RubricFile {
    sections: Vec<RubricSection>,
}

/// Validated, immutable rubric with an id index over its questions.
#[derive(Debug, Clone)]
pub struct Rubric {
    sections: Vec<RubricSection>,
    // question id -> (section position, question position)
    index: FxHashMap<String, (usize, usize)>,
}

impl Rubric {
    /// The rubric compiled into the binary.
    pub fn embedded() -> Result<Self, AuditError> {
        let body = assets::get_asset(assets::RUBRIC_ASSET).ok_or_else(|| {
            AuditError::Rubric(format!("embedded asset '{}' missing", assets::RUBRIC_ASSET))
        })?;
        Self::from_toml_str(&body)
    }

    pub fn from_file(path: &Path) -> Result<Self, AuditError> {
        let body = fs::read_to_string(path).map_err(|e| {
            AuditError::Rubric(format!("cannot read rubric {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&body)
    }

    /// Load the configured rubric, or the embedded one when no path is configured.
    pub fn load(path: Option<&Path>) -> Result<Self, AuditError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::embedded(),
        }
    }

    pub fn from_toml_str(body: &str) -> Result<Self, AuditError> {
        let file: RubricFile =
            toml::from_str(body).map_err(|e| AuditError::Rubric(e.to_string()))?;
        Self::from_sections(file.sections)
    }

    pub fn from_sections(sections: Vec<RubricSection>) -> Result<Self, AuditError> {
        let mut index = FxHashMap::default();
        let mut seen_sections = Vec::with_capacity(sections.len());

        for (si, section) in sections.iter().enumerate() {
            if seen_sections.contains(&section.id) {
                return Err(AuditError::Rubric(format!(
                    "duplicate section id {}",
                    section.id
                )));
            }
            seen_sections.push(section.id);

            if section.questions.is_empty() {
                return Err(AuditError::Rubric(format!(
                    "section {} has no questions",
                    section.id
                )));
            }

            let prefix = format!("{}.", section.id);
            for (qi, question) in section.questions.iter().enumerate() {
                validate_question(question, &prefix)?;
                if index.insert(question.id.clone(), (si, qi)).is_some() {
                    return Err(AuditError::Rubric(format!(
                        "duplicate question id {}",
                        question.id
                    )));
                }
            }

            let sum: u32 = section.questions.iter().map(|q| q.max_points).sum();
            if sum != section.max_points {
                return Err(AuditError::Rubric(format!(
                    "section {} declares {} points but its questions add up to {}",
                    section.id, section.max_points, sum
                )));
            }
        }

        Ok(Self { sections, index })
    }

    pub fn sections(&self) -> &[RubricSection] {
        &self.sections
    }

    pub fn section(&self, id: u32) -> Option<&RubricSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn question(&self, id: &str) -> Option<&RubricQuestion> {
        self.index
            .get(id)
            .map(|&(si, qi)| &self.sections[si].questions[qi])
    }

    /// Section id owning the question.
    pub fn section_of(&self, question_id: &str) -> Option<u32> {
        self.index
            .get(question_id)
            .map(|&(si, _)| self.sections[si].id)
    }

    /// Questions in rubric order (section order, then question order).
    pub fn questions(&self) -> impl Iterator<Item = &RubricQuestion> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    pub fn question_count(&self) -> usize {
        self.index.len()
    }

    pub fn total_points(&self) -> u32 {
        self.sections.iter().map(|s| s.max_points).sum()
    }

    /// Position of a question in rubric order; used to sort derived lists.
    pub fn position(&self, question_id: &str) -> Option<usize> {
        self.questions().position(|q| q.id == question_id)
    }

    pub fn first_section_id(&self) -> Option<u32> {
        self.sections.first().map(|s| s.id)
    }
}

fn validate_question(question: &RubricQuestion, prefix: &str) -> Result<(), AuditError> {
    if !question.id.starts_with(prefix) {
        return Err(AuditError::Rubric(format!(
            "question {} is not numbered under section prefix '{}'",
            question.id, prefix
        )));
    }
    if question.options.is_empty() {
        return Err(AuditError::Rubric(format!(
            "question {} has no scoring options",
            question.id
        )));
    }
    let mut values = question.option_values();
    if values.contains(&0) {
        return Err(AuditError::Rubric(format!(
            "question {}: 0 is reserved for unanswered",
            question.id
        )));
    }
    values.sort_unstable();
    values.dedup();
    if values.len() != question.options.len() {
        return Err(AuditError::Rubric(format!(
            "question {} repeats an option value",
            question.id
        )));
    }
    let top = values.last().copied().unwrap_or_default();
    if top != question.max_points {
        return Err(AuditError::Rubric(format!(
            "question {} max points {} differs from its best option {}",
            question.id, question.max_points, top
        )));
    }
    Ok(())
}
