use chrono::{NaiveDate, NaiveTime};
use rand::SeedableRng;
use rand::rngs::StdRng;
use storeaudit::audit::directory::{Person, PersonRole, StoreEntry, sample_directory};
use storeaudit::audit::handoff::{Handoff, PersistenceState};
use storeaudit::audit::record::FinalizedAuditRecord;
use storeaudit::audit::rubric::Rubric;
use storeaudit::audit::scoring::AuditStatus;
use storeaudit::audit::session::{AuditSession, SignOff};
use storeaudit::audit::signature::Point;
use storeaudit::core::broker;
use storeaudit::core::error::AuditError;
use storeaudit::plugins::admin::HistoryFilter;
use storeaudit::plugins::storage::SqliteStorage;
use tempfile::tempdir;

fn storage() -> (tempfile::TempDir, SqliteStorage) {
    let tmp = tempdir().expect("tempdir");
    let storage = SqliteStorage::new(&tmp.path().join("data"));
    storage.initialize().expect("init");
    storage.seed_master_data().expect("seed");
    (tmp, storage)
}

/// Run a full session with every question scored `score_for(max)` (1 when not an option).
fn finalized(
    seed: u64,
    date: &str,
    store: (&str, &str),
    score_for: impl Fn(u32) -> u32,
) -> FinalizedAuditRecord {
    let rubric = Rubric::embedded().expect("rubric");
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date");
    let time = NaiveTime::from_hms_opt(10, 0, 0).expect("time");
    let mut session =
        AuditSession::start(&rubric, date, time, &mut StdRng::seed_from_u64(seed));
    session.select_store(store.0, store.1).expect("store");
    session.select_manager("2", "Maria López").expect("manager");
    session.select_auditor("1", "Juan Pérez").expect("auditor");
    for q in rubric.questions() {
        let score = score_for(q.max_points);
        let score = if q.allows(score) { score } else { 1 };
        session.set_score(&rubric, &q.id, score).expect("score");
    }
    session
        .set_observation(&rubric, "1.1", "cola en caja")
        .expect("observation");
    session
        .request_submit(&rubric, &sample_directory())
        .expect("submit");

    for x in [0.0, 100.0] {
        let surface = session.signing_mut().expect("signing").surface_mut();
        surface.begin_stroke(Point::new(x, 0.0));
        surface.extend_stroke(Point::new(x + 20.0, 15.0));
        surface.end_stroke();
        session = match session.confirm_signature().expect("confirm") {
            SignOff::Pending(s) => s,
            SignOff::Finalized(record) => return record,
        };
    }
    panic!("sign-off never finalized");
}

#[test]
fn seed_is_only_applied_to_empty_tables() {
    let (_tmp, storage) = storage();
    assert!(!storage.seed_master_data().expect("reseed"));
    let dir = storage.load_directory().expect("directory");
    assert_eq!(dir.stores.len(), 4);
    assert_eq!(dir.people_with_role(PersonRole::Manager).count(), 2);
}

#[test]
fn master_lists_accept_new_entries_and_reject_blank_ids_or_duplicates() {
    let (_tmp, storage) = storage();
    storage
        .add_store(&StoreEntry {
            id: "5".into(),
            name: "Berel Oriente".into(),
            branch: "S-005".into(),
            warehouse: "ALM-OTE".into(),
        })
        .expect("add store");
    let dup = storage.add_store(&StoreEntry {
        id: "5".into(),
        name: "Otra".into(),
        branch: String::new(),
        warehouse: String::new(),
    });
    assert!(dup.is_err());

    storage
        .add_person(&Person {
            id: "4".into(),
            name: "Ana Díaz".into(),
            role: PersonRole::Auditor,
            payroll_id: "10077".into(),
            department: "Auditoría Interna".into(),
        })
        .expect("add person");
    let auditors = storage
        .list_people(Some(PersonRole::Auditor))
        .expect("auditors");
    assert_eq!(auditors.len(), 2);
    assert_eq!(auditors[0].name, "Ana Díaz");

    assert!(matches!(
        storage.add_store(&StoreEntry {
            id: " ".into(),
            name: "x".into(),
            branch: String::new(),
            warehouse: String::new(),
        }),
        Err(AuditError::Validation(_))
    ));
}

#[test]
fn upsert_is_idempotent_by_folio() {
    let (_tmp, storage) = storage();
    let record = finalized(1, "2026-02-01", ("1", "Berel Centro"), |max| max);
    let first = storage.upsert(&record).expect("first save");
    let second = storage.upsert(&record).expect("retry");
    assert_eq!(first, second);

    let entries = storage.list_audits(&HistoryFilter::default()).expect("list");
    assert_eq!(entries.len(), 1);
    assert_eq!(storage.count_answers(&first).expect("answers"), 21);

    let loaded = storage
        .get_audit_by_folio(record.folio().as_str())
        .expect("get");
    assert_eq!(loaded.id, first);
    assert_eq!(loaded.record.total_score(), 100);
    assert_eq!(loaded.record.status(), AuditStatus::ModelStore);
    assert_eq!(loaded.record.answers().get("1.1").expect("1.1").observation, "cola en caja");
    assert_eq!(
        loaded.record.manager_signature().svg_path(),
        record.manager_signature().svg_path()
    );
}

#[test]
fn list_filters_by_date_store_and_status_newest_first() {
    let (_tmp, storage) = storage();
    storage
        .upsert(&finalized(1, "2026-01-10", ("1", "Berel Centro"), |max| max))
        .expect("a");
    storage
        .upsert(&finalized(2, "2026-01-20", ("2", "Berel Norte"), |_| 1))
        .expect("b");
    storage
        .upsert(&finalized(3, "2026-02-05", ("4", "Berel Plaza Real"), |max| max))
        .expect("c");

    let every = storage.list_audits(&HistoryFilter::default()).expect("all");
    let dates: Vec<String> = every
        .iter()
        .map(|e| e.record.date().to_string())
        .collect();
    assert_eq!(dates, vec!["2026-02-05", "2026-01-20", "2026-01-10"]);

    let january = HistoryFilter {
        date_from: NaiveDate::from_ymd_opt(2026, 1, 10),
        date_to: NaiveDate::from_ymd_opt(2026, 1, 20),
        ..HistoryFilter::default()
    };
    assert_eq!(storage.list_audits(&january).expect("january").len(), 2);

    let plaza = HistoryFilter {
        store: Some("PLAZA".into()),
        ..HistoryFilter::default()
    };
    let found = storage.list_audits(&plaza).expect("plaza");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].record.store().name, "Berel Plaza Real");

    let critical = HistoryFilter {
        status: Some(AuditStatus::Critical),
        ..HistoryFilter::default()
    };
    let found = storage.list_audits(&critical).expect("critical");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].record.store().name, "Berel Norte");
}

#[test]
fn delete_cascades_answers_and_reports_missing_ids() {
    let (_tmp, storage) = storage();
    let id = storage
        .upsert(&finalized(9, "2026-03-03", ("3", "Berel Sur"), |max| max))
        .expect("save");
    assert_eq!(storage.count_answers(&id).expect("before"), 21);

    storage.delete_audit(&id).expect("delete");
    assert_eq!(storage.count_answers(&id).expect("after"), 0);
    assert!(matches!(
        storage.delete_audit(&id),
        Err(AuditError::NotFound(_))
    ));
}

#[test]
fn action_plan_is_stored_and_survives_resave() {
    let (_tmp, storage) = storage();
    let record = finalized(4, "2026-04-01", ("1", "Berel Centro"), |_| 1);
    storage.upsert(&record).expect("save");
    storage
        .set_action_plan(record.folio().as_str(), "1. Capacitar al personal")
        .expect("plan");
    storage.upsert(&record).expect("resave without plan");

    let loaded = storage
        .get_audit_by_folio(record.folio().as_str())
        .expect("get");
    assert_eq!(loaded.record.action_plan(), Some("1. Capacitar al personal"));
    assert!(matches!(
        storage.set_action_plan("AB-20260402-1000", "x"),
        Err(AuditError::NotFound(_))
    ));
}

#[test]
fn unavailable_storage_leaves_record_not_saved() {
    let tmp = tempdir().expect("tempdir");
    // A regular file where the data directory should be.
    let blocked = tmp.path().join("data");
    std::fs::write(&blocked, "not a directory").expect("block");
    let storage = SqliteStorage::new(&blocked);

    let record = finalized(5, "2026-05-05", ("1", "Berel Centro"), |max| max);
    let folio = record.folio().clone();
    let mut handoff = Handoff::new(record);
    let state = handoff.attempt(&storage).clone();
    assert!(matches!(state, PersistenceState::NotSaved { .. }));
    assert_eq!(handoff.record().folio(), &folio);
    assert_eq!(handoff.record().total_score(), 100);
}

#[test]
fn every_storage_operation_is_logged_by_the_broker() {
    let (_tmp, storage) = storage();
    let record = finalized(6, "2026-06-06", ("1", "Berel Centro"), |max| max);
    storage.upsert(&record).expect("save");
    let events = broker::read_events(storage.root()).expect("events");
    let upsert = events
        .iter()
        .find(|e| e.op == "storage.audit.upsert")
        .expect("upsert event");
    assert_eq!(upsert.subject.as_deref(), Some(record.folio().as_str()));
    assert_eq!(upsert.status, "success");
    assert!(events.iter().any(|e| e.op == "storage.seed"));
}
