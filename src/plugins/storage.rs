//! SQLite persistence for audit history and master lists.
//!
//! Every operation goes through [`DbBroker`], so each one is serialized and leaves a
//! line in the broker event log.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audit::directory::{self, MasterDirectory, Person, PersonRole, StoreEntry};
use crate::audit::handoff::AuditRepository;
use crate::audit::record::{FinalizedAuditRecord, StoredAudit};
use crate::audit::session::{AnswerMap, AnswerRecord, Selection};
use crate::core::broker::DbBroker;
use crate::core::error::AuditError;
use crate::core::schemas;
use crate::core::time::{self, DATE_FORMAT, TIME_FORMAT};
use crate::plugins::admin::HistoryFilter;

const ACTOR: &str = "storeaudit";

/// A stored audit together with its permanent id.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: String,
    pub record: FinalizedAuditRecord,
}

pub fn audit_db_path(root: &Path) -> PathBuf {
    root.join(schemas::AUDIT_DB_NAME)
}

fn ensure_schema(conn: &Connection) -> Result<(), AuditError> {
    conn.execute(schemas::AUDIT_DB_SCHEMA_STORES, [])?;
    conn.execute(schemas::AUDIT_DB_SCHEMA_PEOPLE, [])?;
    conn.execute(schemas::AUDIT_DB_SCHEMA_AUDITS, [])?;
    conn.execute(schemas::AUDIT_DB_SCHEMA_ANSWERS, [])?;
    conn.execute(schemas::AUDIT_DB_SCHEMA_INDEX_DATE, [])?;
    Ok(())
}

fn load_answers(conn: &Connection, audit_id: &str) -> Result<AnswerMap, AuditError> {
    let mut stmt = conn.prepare(
        "SELECT question_id, score, observation FROM audit_answers WHERE audit_id = ?1",
    )?;
    let rows = stmt.query_map(params![audit_id], |row| {
        Ok(AnswerRecord {
            question_id: row.get(0)?,
            score: row.get(1)?,
            observation: row.get(2)?,
        })
    })?;
    let mut answers = AnswerMap::new();
    for r in rows {
        let answer = r?;
        answers.insert(answer.question_id.clone(), answer);
    }
    Ok(answers)
}

const AUDIT_COLUMNS: &str = "id, folio, store_id, store_name, manager_id, manager_name, \
     auditor_id, auditor_name, audit_date, audit_time, total_score, manager_signature, \
     auditor_signature, action_plan";

fn stored_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, StoredAudit)> {
    Ok((
        row.get(0)?,
        StoredAudit {
            folio: row.get(1)?,
            store: Selection {
                id: row.get(2)?,
                name: row.get(3)?,
            },
            manager: Selection {
                id: row.get(4)?,
                name: row.get(5)?,
            },
            auditor: Selection {
                id: row.get(6)?,
                name: row.get(7)?,
            },
            date: row.get(8)?,
            time: row.get(9)?,
            answers: AnswerMap::new(),
            total_score: row.get(10)?,
            manager_signature: row.get(11)?,
            auditor_signature: row.get(12)?,
            action_plan: row.get(13)?,
        },
    ))
}

fn restore_entry(
    conn: &Connection,
    id: String,
    mut stored: StoredAudit,
) -> Result<AuditEntry, AuditError> {
    stored.answers = load_answers(conn, &id)?;
    Ok(AuditEntry {
        id,
        record: FinalizedAuditRecord::restore(stored)?,
    })
}

/// Handle on one data directory's audit database.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    root: PathBuf,
}

impl SqliteStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn with_conn<F, R>(&self, subject: Option<&str>, op: &str, f: F) -> Result<R, AuditError>
    where
        F: FnOnce(&Connection) -> Result<R, AuditError>,
    {
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&audit_db_path(&self.root), ACTOR, subject, op, |conn| {
            ensure_schema(conn)?;
            f(conn)
        })
    }

    /// Create the data directory and schema.
    pub fn initialize(&self) -> Result<(), AuditError> {
        fs::create_dir_all(&self.root).map_err(AuditError::IoError)?;
        self.with_conn(None, "storage.init", |_| Ok(()))
    }

    /// Insert the built-in sample directory when both master tables are empty.
    /// Returns true when anything was written.
    pub fn seed_master_data(&self) -> Result<bool, AuditError> {
        let sample = directory::sample_directory();
        self.with_conn(None, "storage.seed", |conn| {
            let stores: i64 = conn.query_row("SELECT COUNT(*) FROM stores", [], |r| r.get(0))?;
            let people: i64 = conn.query_row("SELECT COUNT(*) FROM people", [], |r| r.get(0))?;
            if stores > 0 || people > 0 {
                return Ok(false);
            }
            let tx = conn.unchecked_transaction()?;
            for store in &sample.stores {
                insert_store(&tx, store)?;
            }
            for person in &sample.people {
                insert_person(&tx, person)?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn list_stores(&self) -> Result<Vec<StoreEntry>, AuditError> {
        self.with_conn(None, "storage.stores", |conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, branch, warehouse FROM stores ORDER BY name")?;
            let rows = stmt.query_map([], |row| {
                Ok(StoreEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    branch: row.get(2)?,
                    warehouse: row.get(3)?,
                })
            })?;
            let mut stores = Vec::new();
            for r in rows {
                stores.push(r?);
            }
            Ok(stores)
        })
    }

    pub fn add_store(&self, store: &StoreEntry) -> Result<(), AuditError> {
        if store.id.trim().is_empty() || store.name.trim().is_empty() {
            return Err(AuditError::Validation(
                "store id and name are required".to_string(),
            ));
        }
        self.with_conn(Some(&store.id), "storage.store.add", |conn| {
            insert_store(conn, store)
        })
    }

    /// People, optionally restricted to one role, ordered by name.
    pub fn list_people(&self, role: Option<PersonRole>) -> Result<Vec<Person>, AuditError> {
        self.with_conn(None, "storage.people", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, role, payroll_id, department FROM people
                 WHERE (?1 IS NULL OR role = ?1) ORDER BY name",
            )?;
            let rows = stmt.query_map(params![role.map(|r| r.as_str())], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            let mut people = Vec::new();
            for r in rows {
                let (id, name, role, payroll_id, department) = r?;
                people.push(Person {
                    id,
                    name,
                    role: role.parse()?,
                    payroll_id,
                    department,
                });
            }
            Ok(people)
        })
    }

    pub fn add_person(&self, person: &Person) -> Result<(), AuditError> {
        if person.id.trim().is_empty() || person.name.trim().is_empty() {
            return Err(AuditError::Validation(
                "person id and name are required".to_string(),
            ));
        }
        self.with_conn(Some(&person.id), "storage.person.add", |conn| {
            insert_person(conn, person)
        })
    }

    /// Snapshot of both master lists for header validation.
    pub fn load_directory(&self) -> Result<MasterDirectory, AuditError> {
        Ok(MasterDirectory::new(self.list_stores()?, self.list_people(None)?))
    }

    /// Insert or replace the audit with this folio, answers included, in one transaction.
    /// An action plan already stored is kept when the record carries none.
    pub fn upsert(&self, record: &FinalizedAuditRecord) -> Result<String, AuditError> {
        let folio = record.folio().as_str();
        self.with_conn(Some(folio), "storage.audit.upsert", |conn| {
            let tx = conn.unchecked_transaction()?;
            let now = time::now_epoch_z();
            tx.execute(
                "INSERT INTO audits (id, folio, store_id, store_name, manager_id, manager_name,
                     auditor_id, auditor_name, audit_date, audit_time, total_score, status,
                     manager_signature, auditor_signature, action_plan, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
                 ON CONFLICT(folio) DO UPDATE SET
                     store_id = excluded.store_id,
                     store_name = excluded.store_name,
                     manager_id = excluded.manager_id,
                     manager_name = excluded.manager_name,
                     auditor_id = excluded.auditor_id,
                     auditor_name = excluded.auditor_name,
                     audit_date = excluded.audit_date,
                     audit_time = excluded.audit_time,
                     total_score = excluded.total_score,
                     status = excluded.status,
                     manager_signature = excluded.manager_signature,
                     auditor_signature = excluded.auditor_signature,
                     action_plan = COALESCE(excluded.action_plan, audits.action_plan),
                     updated_at = excluded.updated_at",
                params![
                    time::new_event_id(),
                    folio,
                    record.store().id,
                    record.store().name,
                    record.manager().id,
                    record.manager().name,
                    record.auditor().id,
                    record.auditor().name,
                    record.date().format(DATE_FORMAT).to_string(),
                    record.time().format(TIME_FORMAT).to_string(),
                    record.total_score(),
                    record.status().as_str(),
                    record.manager_signature().svg_path(),
                    record.auditor_signature().svg_path(),
                    record.action_plan(),
                    now,
                ],
            )?;
            let id: String =
                tx.query_row("SELECT id FROM audits WHERE folio = ?1", params![folio], |row| {
                    row.get(0)
                })?;
            tx.execute("DELETE FROM audit_answers WHERE audit_id = ?1", params![id])?;
            for answer in record.answers().values() {
                tx.execute(
                    "INSERT INTO audit_answers (audit_id, question_id, score, observation)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, answer.question_id, answer.score, answer.observation],
                )?;
            }
            tx.commit()?;
            Ok(id)
        })
    }

    /// Audits matching `filter`, newest first. Rows that no longer form a valid record
    /// are skipped with a warning.
    pub fn list_audits(&self, filter: &HistoryFilter) -> Result<Vec<AuditEntry>, AuditError> {
        self.with_conn(None, "storage.audit.list", |conn| {
            let sql = format!(
                "SELECT {} FROM audits
                 WHERE (?1 IS NULL OR audit_date >= ?1) AND (?2 IS NULL OR audit_date <= ?2)
                 ORDER BY audit_date DESC, audit_time DESC, created_at DESC",
                AUDIT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let from = filter.date_from.map(|d| d.format(DATE_FORMAT).to_string());
            let to = filter.date_to.map(|d| d.format(DATE_FORMAT).to_string());
            let rows = stmt.query_map(params![from, to], stored_from_row)?;
            let mut raw = Vec::new();
            for r in rows {
                raw.push(r?);
            }

            let mut entries = Vec::new();
            for (id, stored) in raw {
                let folio = stored.folio.clone();
                match restore_entry(conn, id, stored) {
                    Ok(entry) if filter.matches(&entry.record) => entries.push(entry),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(folio = %folio, error = %e, "skipping unreadable audit")
                    }
                }
            }
            Ok(entries)
        })
    }

    pub fn get_audit_by_folio(&self, folio: &str) -> Result<AuditEntry, AuditError> {
        self.with_conn(Some(folio), "storage.audit.get", |conn| {
            let sql = format!("SELECT {} FROM audits WHERE folio = ?1", AUDIT_COLUMNS);
            let found = conn
                .query_row(&sql, params![folio], stored_from_row)
                .optional()?;
            let (id, stored) =
                found.ok_or_else(|| AuditError::NotFound(format!("audit {}", folio)))?;
            restore_entry(conn, id, stored)
        })
    }

    /// Delete an audit and, through the cascade, its answers.
    pub fn delete_audit(&self, id: &str) -> Result<(), AuditError> {
        self.with_conn(Some(id), "storage.audit.delete", |conn| {
            let n = conn.execute("DELETE FROM audits WHERE id = ?1", params![id])?;
            if n == 0 {
                return Err(AuditError::NotFound(format!("audit id {}", id)));
            }
            Ok(())
        })
    }

    pub fn set_action_plan(&self, folio: &str, plan: &str) -> Result<(), AuditError> {
        self.with_conn(Some(folio), "storage.audit.plan", |conn| {
            let n = conn.execute(
                "UPDATE audits SET action_plan = ?1, updated_at = ?2 WHERE folio = ?3",
                params![plan, time::now_epoch_z(), folio],
            )?;
            if n == 0 {
                return Err(AuditError::NotFound(format!("audit {}", folio)));
            }
            Ok(())
        })
    }

    /// Answer rows stored for an audit id; used to check cascades.
    pub fn count_answers(&self, id: &str) -> Result<usize, AuditError> {
        self.with_conn(Some(id), "storage.answers.count", |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM audit_answers WHERE audit_id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            Ok(n as usize)
        })
    }
}

fn insert_store(conn: &Connection, store: &StoreEntry) -> Result<(), AuditError> {
    conn.execute(
        "INSERT INTO stores (id, name, branch, warehouse, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            store.id.trim(),
            store.name.trim(),
            store.branch.trim(),
            store.warehouse.trim(),
            time::now_epoch_z()
        ],
    )?;
    Ok(())
}

fn insert_person(conn: &Connection, person: &Person) -> Result<(), AuditError> {
    conn.execute(
        "INSERT INTO people (id, name, role, payroll_id, department, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            person.id.trim(),
            person.name.trim(),
            person.role.as_str(),
            person.payroll_id.trim(),
            person.department.trim(),
            time::now_epoch_z()
        ],
    )?;
    Ok(())
}

impl AuditRepository for SqliteStorage {
    fn upsert_audit(&self, record: &FinalizedAuditRecord) -> Result<String, AuditError> {
        self.upsert(record)
            .map_err(|e| AuditError::Persistence(e.to_string()))
    }
}
