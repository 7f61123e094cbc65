//! A session from first score to saved record, across every audit module.

use chrono::{NaiveDate, NaiveTime};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;
use storeaudit::audit::directory::sample_directory;
use storeaudit::audit::export;
use storeaudit::audit::handoff::{AuditRepository, Handoff, PersistenceState};
use storeaudit::audit::progress::SectionStatus;
use storeaudit::audit::record::FinalizedAuditRecord;
use storeaudit::audit::report::{self, FindingsBlock};
use storeaudit::audit::rubric::Rubric;
use storeaudit::audit::scoring::AuditStatus;
use storeaudit::audit::session::{AuditSession, SignOff};
use storeaudit::audit::signature::{CaptureSurface, Point, SequencerState};
use storeaudit::core::error::AuditError;

fn start(rubric: &Rubric) -> AuditSession {
    AuditSession::start(
        rubric,
        NaiveDate::from_ymd_opt(2026, 8, 19).expect("date"),
        NaiveTime::from_hms_opt(16, 45, 0).expect("time"),
        &mut StdRng::seed_from_u64(2026),
    )
}

fn scribble(surface: &mut CaptureSurface, x: f32) {
    surface.begin_stroke(Point::new(x, 4.0));
    surface.extend_stroke(Point::new(x + 12.0, 18.0));
    surface.extend_stroke(Point::new(x + 30.0, 2.0));
    surface.end_stroke();
}

#[derive(Default)]
struct MemoryRepo {
    fail_first: bool,
    calls: RefCell<u32>,
    saved: RefCell<Vec<String>>,
}

impl AuditRepository for MemoryRepo {
    fn upsert_audit(&self, record: &FinalizedAuditRecord) -> Result<String, AuditError> {
        *self.calls.borrow_mut() += 1;
        if self.fail_first && *self.calls.borrow() == 1 {
            return Err(AuditError::Persistence("database is locked".into()));
        }
        self.saved.borrow_mut().push(record.folio().to_string());
        Ok(format!("id-{}", record.folio()))
    }
}

#[test]
fn acceptable_audit_runs_from_scores_to_saved_record() {
    let rubric = Rubric::embedded().expect("rubric");
    let mut session = start(&rubric);
    assert!(session.folio().as_str().starts_with("AB-20260819-"));

    session.select_store("3", "Berel Sur").expect("store");
    session.select_manager("3", "Carlos Ruiz").expect("manager");
    session.select_auditor("1", "Juan Pérez").expect("auditor");

    // Section 3 at 2 of 4 everywhere, the rest at maximum: 100 - 10 = 90.
    for q in rubric.questions() {
        let score = if q.id.starts_with("3.") { 2 } else { q.max_points };
        session.set_score(&rubric, &q.id, score).expect("score");
    }
    session
        .set_observation(&rubric, "3.2", "pasillos con cajas")
        .expect("observation");
    assert_eq!(session.running_total(), 90);

    let progress = session.progress(&rubric);
    assert!(progress.is_complete());
    assert_eq!(progress.percentage, 100);
    assert!(progress
        .sections
        .iter()
        .all(|s| s.status == SectionStatus::Completed));

    session
        .request_submit(&rubric, &sample_directory())
        .expect("submit");
    assert!(session.is_signing());
    assert!(matches!(
        session.set_score(&rubric, "1.1", 6),
        Err(AuditError::SessionLocked)
    ));

    // A blank surface bounces back with the session intact.
    let rejected = session.confirm_signature().expect_err("blank manager");
    assert!(matches!(rejected.error, AuditError::EmptySignature(_)));
    let mut session = rejected.session;

    scribble(session.signing_mut().expect("signing").surface_mut(), 0.0);
    let mut session = match session.confirm_signature().expect("manager") {
        SignOff::Pending(s) => s,
        SignOff::Finalized(_) => panic!("finalized after one signature"),
    };
    let sequencer = session.signing().expect("signing");
    assert_eq!(sequencer.state(), SequencerState::AwaitingAuditor);
    assert!(sequencer.surface().is_blank());

    scribble(session.signing_mut().expect("signing").surface_mut(), 50.0);
    let record = match session.confirm_signature().expect("auditor") {
        SignOff::Finalized(record) => record,
        SignOff::Pending(_) => panic!("still pending after both signatures"),
    };
    assert_eq!(record.total_score(), 90);
    assert_eq!(record.status(), AuditStatus::Acceptable);
    assert_ne!(
        record.manager_signature().digest(),
        record.auditor_signature().digest()
    );

    let view = report::build_report(&record, &rubric, 3);
    assert_eq!(view.status_label, "ACCEPTABLE");
    match &view.findings {
        FindingsBlock::Listed { findings, overflow } => {
            assert_eq!(findings.len(), 3);
            assert_eq!(*overflow, 2);
            assert_eq!(findings[0].question_id, "3.1");
        }
        FindingsBlock::Clear { .. } => panic!("section 3 findings missing"),
    }
    assert!(view.render_text().contains("... 2 more findings recorded"));

    let csv = export::to_csv(std::slice::from_ref(&record), &rubric).expect("csv");
    let row = csv.lines().nth(1).expect("row");
    assert!(row.contains("\"90\",\"ACCEPTABLE\""));

    let repo = MemoryRepo {
        fail_first: true,
        ..MemoryRepo::default()
    };
    let mut handoff = Handoff::new(record);
    assert!(matches!(
        handoff.attempt(&repo),
        PersistenceState::NotSaved { .. }
    ));
    assert!(matches!(handoff.attempt(&repo), PersistenceState::Saved { .. }));
    assert_eq!(handoff.attempts(), 2);
    assert_eq!(repo.saved.borrow().len(), 1);
    assert_eq!(handoff.record().total_score(), 90);
}

#[test]
fn cancelled_signing_keeps_answers_and_unlocks_the_form() {
    let rubric = Rubric::embedded().expect("rubric");
    let mut session = start(&rubric);
    session.select_store("1", "Berel Centro").expect("store");
    session.select_manager("2", "Maria López").expect("manager");
    session.select_auditor("1", "Juan Pérez").expect("auditor");
    for q in rubric.questions() {
        session.set_score(&rubric, &q.id, q.max_points).expect("score");
    }
    session
        .request_submit(&rubric, &sample_directory())
        .expect("submit");
    scribble(session.signing_mut().expect("signing").surface_mut(), 0.0);
    session.cancel_signing();

    assert!(!session.is_signing());
    assert_eq!(session.running_total(), 100);
    session.set_score(&rubric, "2.1", 3).expect("editable again");
    assert_eq!(session.running_total(), 98);
}

#[test]
fn incomplete_submission_points_at_first_open_section() {
    let rubric = Rubric::embedded().expect("rubric");
    let mut session = start(&rubric);
    session.select_store("1", "Berel Centro").expect("store");
    session.select_manager("2", "Maria López").expect("manager");
    session.select_auditor("1", "Juan Pérez").expect("auditor");
    for q in rubric.questions().filter(|q| !q.id.starts_with("3.")) {
        session.set_score(&rubric, &q.id, q.max_points).expect("score");
    }

    let err = session
        .request_submit(&rubric, &sample_directory())
        .expect_err("section 3 open");
    assert!(matches!(err, AuditError::AnswersIncomplete { section: 3, .. }));
    assert!(session.show_validation_errors());
    assert_eq!(session.active_section(), 3);
    assert!(!session.is_signing());

    let progress = session.progress(&rubric);
    let third = progress
        .sections
        .iter()
        .find(|s| s.section_id == 3)
        .expect("section 3");
    assert_eq!(third.status, SectionStatus::Error);
}
