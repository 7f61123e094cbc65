//! Findings: answers worth a line in the report or a step in the action plan.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::audit::rubric::Rubric;
use crate::audit::session::AnswerMap;

/// Scores strictly below this are findings even without an observation.
pub const FINDING_SCORE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Alert,
    Improvable,
}

impl Severity {
    /// Tag from score / max points: at most half is critical, at most three quarters
    /// is an alert.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= 0.5 {
            Severity::Critical
        } else if ratio <= 0.75 {
            Severity::Alert
        } else {
            Severity::Improvable
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Alert => "alert",
            Severity::Improvable => "improvable",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Finding {
    pub question_id: String,
    pub section_id: u32,
    pub category: String,
    pub criterion: String,
    pub score: u32,
    pub max_points: u32,
    pub observation: Option<String>,
}

impl Finding {
    pub fn ratio(&self) -> f64 {
        if self.max_points == 0 {
            0.0
        } else {
            self.score as f64 / self.max_points as f64
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::from_ratio(self.ratio())
    }
}

/// Findings in rubric order. Answers whose id the rubric does not know are dropped.
pub fn findings(rubric: &Rubric, answers: &AnswerMap) -> Vec<Finding> {
    rubric
        .sections()
        .iter()
        .flat_map(|section| section.questions.iter().map(move |q| (section.id, q)))
        .filter_map(|(section_id, q)| {
            let answer = answers.get(&q.id)?;
            let observation = answer.observation.trim();
            if observation.is_empty() && answer.score >= FINDING_SCORE_THRESHOLD {
                return None;
            }
            Some(Finding {
                question_id: q.id.clone(),
                section_id,
                category: q.category.clone(),
                criterion: q.criterion.clone(),
                score: answer.score,
                max_points: q.max_points,
                observation: (!observation.is_empty()).then(|| observation.to_string()),
            })
        })
        .collect()
}

/// One line of evidence handed to the action-plan drafter.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Evidence {
    pub question_id: String,
    pub severity: Severity,
    pub category: String,
    pub criterion: String,
    pub score: u32,
    pub max_points: u32,
    pub observation: Option<String>,
}

impl Evidence {
    pub fn observation_missing(&self) -> bool {
        self.observation.is_none()
    }
}

/// Findings ordered worst first; on equal ratio, findings nobody explained come first.
pub fn evidence(rubric: &Rubric, answers: &AnswerMap) -> Vec<Evidence> {
    let mut found = findings(rubric, answers);
    found.sort_by(|a, b| {
        a.ratio()
            .partial_cmp(&b.ratio())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.observation.is_none().cmp(&a.observation.is_none()))
    });
    found
        .into_iter()
        .map(|f| Evidence {
            severity: f.severity(),
            question_id: f.question_id,
            category: f.category,
            criterion: f.criterion,
            score: f.score,
            max_points: f.max_points,
            observation: f.observation,
        })
        .collect()
}
