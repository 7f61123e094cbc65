//! Store handle for the audit data directory.
//!
//! A project keeps its state under `<project>/.storeaudit/`: configuration at the top
//! level and the SQLite database plus append-only event logs under `data/`.

use std::path::{Path, PathBuf};

pub const PROJECT_DIR_NAME: &str = ".storeaudit";
pub const DATA_DIR_NAME: &str = "data";

/// Store handle representing one audit data directory.
///
/// All persisted state (audit history, master lists, broker log) is scoped to a store.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the data directory (`<project>/.storeaudit/data`)
    pub root: PathBuf,
}

impl Store {
    pub fn for_project(project_root: &Path) -> Self {
        Self {
            root: project_root.join(PROJECT_DIR_NAME).join(DATA_DIR_NAME),
        }
    }

    pub fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}
