//! Master lists of stores and people that audit headers select from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::AuditError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreEntry {
    pub id: String,
    pub name: String,
    pub branch: String,
    pub warehouse: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PersonRole {
    Auditor,
    #[serde(rename = "Gerente")]
    Manager,
}

impl PersonRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonRole::Auditor => "Auditor",
            PersonRole::Manager => "Gerente",
        }
    }
}

impl fmt::Display for PersonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonRole {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auditor" => Ok(PersonRole::Auditor),
            "gerente" | "manager" => Ok(PersonRole::Manager),
            other => Err(AuditError::Validation(format!(
                "unknown role '{}' (expected Auditor or Gerente)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub role: PersonRole,
    pub payroll_id: String,
    pub department: String,
}

/// Snapshot of the master lists a session validates its header against.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterDirectory {
    pub stores: Vec<StoreEntry>,
    pub people: Vec<Person>,
}

impl MasterDirectory {
    pub fn new(stores: Vec<StoreEntry>, people: Vec<Person>) -> Self {
        Self { stores, people }
    }

    pub fn store(&self, id: &str) -> Option<&StoreEntry> {
        self.stores.iter().find(|s| s.id == id)
    }

    /// Person with the given id holding the given role.
    pub fn person(&self, id: &str, role: PersonRole) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id && p.role == role)
    }

    pub fn people_with_role(&self, role: PersonRole) -> impl Iterator<Item = &Person> {
        self.people.iter().filter(move |p| p.role == role)
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty() && self.people.is_empty()
    }
}

/// Sample master data written by `init` into an empty database.
pub fn sample_directory() -> MasterDirectory {
    let store = |id: &str, name: &str, branch: &str, warehouse: &str| StoreEntry {
        id: id.to_string(),
        name: name.to_string(),
        branch: branch.to_string(),
        warehouse: warehouse.to_string(),
    };
    let person = |id: &str, name: &str, role, payroll: &str, dept: &str| Person {
        id: id.to_string(),
        name: name.to_string(),
        role,
        payroll_id: payroll.to_string(),
        department: dept.to_string(),
    };
    MasterDirectory {
        stores: vec![
            store("1", "Berel Centro", "S-001", "ALM-CENTRO"),
            store("2", "Berel Norte", "S-002", "ALM-NORTE"),
            store("3", "Berel Sur", "S-003", "ALM-SUR"),
            store("4", "Berel Plaza Real", "S-004", "ALM-PLAZA"),
        ],
        people: vec![
            person("1", "Juan Pérez", PersonRole::Auditor, "10054", "Auditoría Interna"),
            person("2", "Maria López", PersonRole::Manager, "20033", "Ventas Retail"),
            person("3", "Carlos Ruiz", PersonRole::Manager, "20045", "Ventas Retail"),
        ],
    }
}
