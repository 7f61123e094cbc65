//! Ambient plumbing shared by the audit domain and its collaborators.

pub mod assets;
pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
