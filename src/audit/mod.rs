//! Audit domain: rubric, session state machine, signatures, scoring and the
//! derivations made from a finalized record.

pub mod directory;
pub mod export;
pub mod findings;
pub mod folio;
pub mod handoff;
pub mod progress;
pub mod record;
pub mod report;
pub mod rubric;
pub mod scoring;
pub mod session;
pub mod signature;
