//! Collaborators around the audit domain: persistence, drafting and the admin console.

pub mod admin;
pub mod drafting;
pub mod pending;
pub mod storage;
