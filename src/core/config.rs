//! Project configuration loaded from `.storeaudit/config.toml`.
//!
//! A missing file is not an error: every section has defaults, so a fresh checkout
//! works with the embedded rubric, no drafting service and the shared passphrase.

use crate::core::error::AuditError;
use crate::core::store::PROJECT_DIR_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const PASSPHRASE_ENV: &str = "STOREAUDIT_ADMIN_PASSPHRASE";
pub const DEFAULT_PASSPHRASE: &str = "Berel26";
pub const DEFAULT_MAX_FINDINGS: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub drafting: DraftingConfig,
    #[serde(default)]
    pub rubric: RubricConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminConfig {
    #[serde(default = "default_passphrase")]
    pub passphrase: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            passphrase: default_passphrase(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Findings shown in the report body before the overflow note.
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_findings: default_max_findings(),
        }
    }
}

/// External program that turns a prompt on stdin into an action plan on stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftingConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RubricConfig {
    /// Replaces the embedded rubric. Relative paths resolve against the project root.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_passphrase() -> String {
    DEFAULT_PASSPHRASE.to_string()
}

fn default_max_findings() -> usize {
    DEFAULT_MAX_FINDINGS
}

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Load config from `<project>/.storeaudit/config.toml`, falling back to defaults.
pub fn load_config(project_root: &Path) -> Result<AuditConfig, AuditError> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(AuditConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(AuditError::IoError)?;
    let config: AuditConfig = toml::from_str(&content)
        .map_err(|e| AuditError::Config(format!("{}: {}", path.display(), e)))?;
    if config.report.max_findings == 0 {
        return Err(AuditError::Config(
            "report.max_findings must be at least 1".to_string(),
        ));
    }
    Ok(config)
}

/// Write the default config unless one already exists. Returns true when written.
pub fn write_default_config(project_root: &Path) -> Result<bool, AuditError> {
    let path = config_path(project_root);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(&AuditConfig::default())
        .map_err(|e| AuditError::Config(e.to_string()))?;
    fs::write(&path, body)?;
    Ok(true)
}

impl AuditConfig {
    /// Passphrase in effect: the environment wins over the file.
    pub fn effective_passphrase(&self) -> String {
        std::env::var(PASSPHRASE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.admin.passphrase.clone())
    }

    pub fn rubric_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.rubric.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                project_root.join(p)
            }
        })
    }
}
