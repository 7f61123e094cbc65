use chrono::NaiveDate;
use storeaudit::audit::record::{FinalizedAuditRecord, StoredAudit};
use storeaudit::audit::rubric::Rubric;
use storeaudit::audit::scoring::AuditStatus;
use storeaudit::audit::session::{AnswerMap, AnswerRecord, Selection};
use storeaudit::core::config::AuditConfig;
use storeaudit::core::error::AuditError;
use storeaudit::plugins::admin::{self, HistoryFilter};

fn record(folio: &str, date: &str, store: &str, score: impl Fn(u32) -> u32) -> FinalizedAuditRecord {
    let rubric = Rubric::embedded().expect("rubric");
    let answers: AnswerMap = rubric
        .questions()
        .map(|q| (q.id.clone(), AnswerRecord::scored(&q.id, score(q.max_points))))
        .collect();
    FinalizedAuditRecord::restore(StoredAudit {
        folio: folio.into(),
        store: Selection::new("9", store),
        manager: Selection::new("2", "Maria López"),
        auditor: Selection::new("1", "Juan Pérez"),
        date: date.into(),
        time: "09:00".into(),
        answers,
        total_score: 0,
        manager_signature: "M 1 1 L 2 2".into(),
        auditor_signature: "M 3 3 L 4 4".into(),
        action_plan: None,
    })
    .expect("restore")
}

fn history() -> Vec<FinalizedAuditRecord> {
    vec![
        record("AB-20260301-1001", "2026-03-01", "Berel Centro", |max| max),
        record("AB-20260315-1002", "2026-03-15", "Berel Norte", |_| 1),
        record("AB-20260331-1003", "2026-03-31", "Berel Plaza Real", |max| max),
        record("AB-20260401-1004", "2026-04-01", "Berel Norte", |max| max),
    ]
}

fn folios<'a>(it: impl Iterator<Item = &'a FinalizedAuditRecord>) -> Vec<String> {
    it.map(|r| r.folio().to_string()).collect()
}

#[test]
fn authorize_accepts_only_the_exact_passphrase() {
    let config = AuditConfig::default();
    let expected = config.effective_passphrase();
    admin::authorize(&config, Some(&expected)).expect("exact match");

    let padded = format!(" {expected}");
    assert!(matches!(
        admin::authorize(&config, Some(&padded)),
        Err(AuditError::AccessDenied(_))
    ));
    assert!(matches!(
        admin::authorize(&config, Some(&expected.to_lowercase().repeat(2))),
        Err(AuditError::AccessDenied(_))
    ));
}

#[test]
fn authorize_without_passphrase_asks_for_one() {
    let err = admin::authorize(&AuditConfig::default(), None).expect_err("missing");
    assert!(err.to_string().contains("--passphrase"));
}

#[test]
fn empty_filter_keeps_everything() {
    let filter = HistoryFilter::default();
    assert!(filter.is_empty());
    assert_eq!(filter.apply(&history()).count(), 4);
}

#[test]
fn date_range_is_inclusive_on_both_ends() {
    let records = history();
    let march = HistoryFilter {
        date_from: NaiveDate::from_ymd_opt(2026, 3, 1),
        date_to: NaiveDate::from_ymd_opt(2026, 3, 31),
        ..HistoryFilter::default()
    };
    assert!(!march.is_empty());
    assert_eq!(
        folios(march.apply(&records)),
        vec!["AB-20260301-1001", "AB-20260315-1002", "AB-20260331-1003"]
    );

    let open_ended = HistoryFilter {
        date_from: NaiveDate::from_ymd_opt(2026, 3, 31),
        ..HistoryFilter::default()
    };
    assert_eq!(open_ended.apply(&records).count(), 2);
}

#[test]
fn store_and_status_combine() {
    let records = history();
    let norte = HistoryFilter {
        store: Some("norte".into()),
        ..HistoryFilter::default()
    };
    assert_eq!(norte.apply(&records).count(), 2);

    let critical_norte = HistoryFilter {
        status: Some(AuditStatus::Critical),
        ..norte.clone()
    };
    assert_eq!(
        folios(critical_norte.apply(&records)),
        vec!["AB-20260315-1002"]
    );

    let blank_store = HistoryFilter {
        store: Some("   ".into()),
        status: Some(AuditStatus::ModelStore),
        ..HistoryFilter::default()
    };
    assert_eq!(blank_store.apply(&records).count(), 3);
}
