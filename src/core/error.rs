use crate::audit::progress::HeaderField;
use crate::audit::signature::SignerRole;
use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Rubric error: {0}")]
    Rubric(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Header incomplete: select {}", HeaderField::join(.0))]
    HeaderIncomplete(Vec<HeaderField>),
    #[error("Section {section} has unanswered questions: {}", .missing.join(", "))]
    AnswersIncomplete { section: u32, missing: Vec<String> },
    #[error("Unknown question: {0}")]
    UnknownQuestion(String),
    #[error("Unknown section: {0}")]
    UnknownSection(u32),
    #[error("Score {score} is not an option for question {question_id} (allowed: {allowed:?})")]
    InvalidScore {
        question_id: String,
        score: u32,
        allowed: Vec<u32>,
    },
    #[error("Unknown {field} '{id}': {remediation}")]
    UnknownIdentity {
        field: HeaderField,
        id: String,
        remediation: String,
    },
    #[error("Signature for {0} is empty: draw on the capture surface before confirming")]
    EmptySignature(SignerRole),
    #[error("Signature capture has not started")]
    SigningNotStarted,
    #[error("Session is locked while signatures are being captured")]
    SessionLocked,
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Drafting error: {0}")]
    Drafting(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
