//! Database schema definitions for the audit store.
//!
//! Everything lives in one SQLite file: master lists (stores, people) and the audit
//! history (one header row per folio plus one row per answered question).

pub const AUDIT_DB_NAME: &str = "audits.db";
pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";
pub const DRAFTING_EVENTS_NAME: &str = "drafting.events.jsonl";

pub const AUDIT_DB_SCHEMA_STORES: &str = "
    CREATE TABLE IF NOT EXISTS stores (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        branch TEXT NOT NULL,
        warehouse TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
";

pub const AUDIT_DB_SCHEMA_PEOPLE: &str = "
    CREATE TABLE IF NOT EXISTS people (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        role TEXT NOT NULL CHECK(role IN ('Auditor', 'Gerente')),
        payroll_id TEXT NOT NULL,
        department TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
";

pub const AUDIT_DB_SCHEMA_AUDITS: &str = "
    CREATE TABLE IF NOT EXISTS audits (
        id TEXT PRIMARY KEY,
        folio TEXT NOT NULL UNIQUE,
        store_id TEXT NOT NULL,
        store_name TEXT NOT NULL,
        manager_id TEXT NOT NULL,
        manager_name TEXT NOT NULL,
        auditor_id TEXT NOT NULL,
        auditor_name TEXT NOT NULL,
        audit_date TEXT NOT NULL,
        audit_time TEXT NOT NULL,
        total_score INTEGER NOT NULL,
        status TEXT NOT NULL,
        manager_signature TEXT NOT NULL,
        auditor_signature TEXT NOT NULL,
        action_plan TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(store_id) REFERENCES stores(id),
        FOREIGN KEY(manager_id) REFERENCES people(id),
        FOREIGN KEY(auditor_id) REFERENCES people(id)
    )
";

pub const AUDIT_DB_SCHEMA_ANSWERS: &str = "
    CREATE TABLE IF NOT EXISTS audit_answers (
        audit_id TEXT NOT NULL,
        question_id TEXT NOT NULL,
        score INTEGER NOT NULL,
        observation TEXT NOT NULL DEFAULT '',
        PRIMARY KEY(audit_id, question_id),
        FOREIGN KEY(audit_id) REFERENCES audits(id) ON DELETE CASCADE
    )
";

pub const AUDIT_DB_SCHEMA_INDEX_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_audits_date ON audits(audit_date)";
