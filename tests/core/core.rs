use storeaudit::core::assets;
use storeaudit::core::broker::{self, DbBroker};
use storeaudit::core::config::{self, AuditConfig};
use storeaudit::core::db;
use storeaudit::core::error::AuditError;
use storeaudit::core::output;
use storeaudit::core::schemas;
use storeaudit::core::store::Store;
use storeaudit::core::time;
use std::fs;
use std::sync::{Arc, Barrier};
use tempfile::tempdir;

#[test]
fn embedded_rubric_asset_parses() {
    let body = assets::get_asset(assets::RUBRIC_ASSET).expect("rubric asset");
    let value: toml::Value = toml::from_str(&body).expect("rubric is valid toml");
    let sections = value
        .get("sections")
        .and_then(|s| s.as_array())
        .expect("sections array");
    assert_eq!(sections.len(), 5);
}

#[test]
fn db_connect_applies_pragmas() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join(schemas::AUDIT_DB_NAME);
    let conn = db::db_connect(&path.to_string_lossy()).expect("db connect");

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("journal_mode");
    assert_eq!(mode.to_lowercase(), "wal");
    let fk_on: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("foreign_keys");
    assert_eq!(fk_on, 1);
}

#[test]
fn broker_serializes_concurrent_writers_and_logs_each_op() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().to_path_buf();
    let db_path = root.join("concurrent.db");
    DbBroker::new(&root)
        .with_conn(&db_path, "test", None, "setup", |conn| {
            conn.execute("CREATE TABLE hits (n INTEGER NOT NULL)", [])?;
            Ok(())
        })
        .expect("setup");

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let root = root.clone();
            let db_path = db_path.clone();
            std::thread::spawn(move || {
                barrier.wait();
                DbBroker::new(&root)
                    .with_conn(&db_path, "test", None, "insert", |conn| {
                        conn.execute("INSERT INTO hits (n) VALUES (?1)", [i])?;
                        Ok(())
                    })
                    .expect("insert");
            })
        })
        .collect();
    for h in handles {
        h.join().expect("join");
    }

    let count: i64 = DbBroker::new(&root)
        .with_conn(&db_path, "test", None, "count", |conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM hits", [], |row| row.get(0))?)
        })
        .expect("count");
    assert_eq!(count, 4);

    let events = broker::read_events(&root).expect("events");
    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|e| e.status == "success"));
    assert_eq!(events.iter().filter(|e| e.op == "insert").count(), 4);
}

#[test]
fn broker_read_events_without_log_is_empty() {
    let tmp = tempdir().expect("tempdir");
    assert!(broker::read_events(tmp.path()).expect("read").is_empty());
}

#[test]
fn config_round_trip_through_project_dir() {
    let tmp = tempdir().expect("tempdir");
    assert!(config::write_default_config(tmp.path()).expect("write"));
    let written = fs::read_to_string(config::config_path(tmp.path())).expect("read");
    assert!(written.contains("[admin]"));
    assert!(written.contains("max_findings = 10"));

    fs::write(
        config::config_path(tmp.path()),
        "[admin]\npassphrase = \"otra\"\n\n[report]\nmax_findings = 3\n",
    )
    .expect("rewrite");
    let cfg: AuditConfig = config::load_config(tmp.path()).expect("load");
    assert_eq!(cfg.admin.passphrase, "otra");
    assert_eq!(cfg.report.max_findings, 3);
}

#[test]
fn malformed_config_is_a_config_error() {
    let tmp = tempdir().expect("tempdir");
    config::write_default_config(tmp.path()).expect("write");
    fs::write(config::config_path(tmp.path()), "[report\nmax_findings = ").expect("rewrite");
    assert!(matches!(
        config::load_config(tmp.path()),
        Err(AuditError::Config(_))
    ));
}

#[test]
fn store_for_project_points_at_data_dir() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::for_project(tmp.path());
    assert_eq!(store.root, tmp.path().join(".storeaudit").join("data"));
    assert_eq!(Store::at(tmp.path()).root, tmp.path());
}

#[test]
fn append_jsonl_appends_lines() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("events.jsonl");
    time::append_jsonl(&path, &serde_json::json!({"n": 1})).expect("append 1");
    time::append_jsonl(&path, &serde_json::json!({"n": 2})).expect("append 2");
    let body = fs::read_to_string(&path).expect("read");
    assert_eq!(body.lines().count(), 2);
    assert!(body.starts_with("{\"n\":1}"));
}

#[test]
fn output_helpers_bound_width() {
    assert_eq!(output::compact_line("uno\n dos", 40), "uno dos");
    assert_eq!(output::column("AB-20260101-1234", 18).chars().count(), 18);
}
