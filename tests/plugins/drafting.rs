use std::cell::RefCell;
use storeaudit::audit::findings::Severity;
use storeaudit::audit::record::{FinalizedAuditRecord, StoredAudit};
use storeaudit::audit::rubric::Rubric;
use storeaudit::audit::session::{AnswerMap, AnswerRecord, Selection};
use storeaudit::core::config::DraftingConfig;
use storeaudit::core::error::AuditError;
use storeaudit::core::schemas;
use storeaudit::plugins::drafting::{
    self, ActionPlanDrafter, CONGRATULATION_MESSAGE, CONNECTION_ERROR_MESSAGE, CommandDrafter,
    DraftRequest, EMPTY_OUTPUT_MESSAGE, NOT_CONFIGURED_MESSAGE,
};
use tempfile::tempdir;

fn record(rubric: &Rubric, tweak: impl Fn(&mut AnswerMap)) -> FinalizedAuditRecord {
    let mut answers: AnswerMap = rubric
        .questions()
        .map(|q| (q.id.clone(), AnswerRecord::scored(&q.id, q.max_points)))
        .collect();
    tweak(&mut answers);
    FinalizedAuditRecord::restore(StoredAudit {
        folio: "AB-20260707-3141".into(),
        store: Selection::new("2", "Berel Norte"),
        manager: Selection::new("3", "Carlos Ruiz"),
        auditor: Selection::new("1", "Juan Pérez"),
        date: "2026-07-07".into(),
        time: "11:20".into(),
        total_score: 0,
        answers,
        manager_signature: "M 0 0 L 4 4".into(),
        auditor_signature: "M 8 8 L 1 1".into(),
        action_plan: None,
    })
    .expect("restore")
}

fn with_findings(answers: &mut AnswerMap) {
    let low = answers.get_mut("1.3").expect("1.3");
    low.score = 1;
    let noted = answers.get_mut("4.2").expect("4.2");
    noted.observation = "extintor vencido".into();
}

struct Scripted {
    reply: Result<String, String>,
    seen: RefCell<Vec<DraftRequest>>,
}

impl Scripted {
    fn new(reply: Result<&str, &str>) -> Self {
        Self {
            reply: reply.map(str::to_string).map_err(str::to_string),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl ActionPlanDrafter for Scripted {
    fn draft(&self, request: &DraftRequest) -> Result<String, AuditError> {
        self.seen.borrow_mut().push(request.clone());
        self.reply.clone().map_err(AuditError::Drafting)
    }
}

#[test]
fn no_findings_congratulates_without_calling_the_drafter() {
    let rubric = Rubric::embedded().expect("rubric");
    let drafter = Scripted::new(Ok("should not be used"));
    let plan = drafting::draft_action_plan(Some(&drafter), &record(&rubric, |_| {}), &rubric);
    assert_eq!(plan, CONGRATULATION_MESSAGE);
    assert!(drafter.seen.borrow().is_empty());
}

#[test]
fn missing_drafter_yields_manual_message() {
    let rubric = Rubric::embedded().expect("rubric");
    let plan = drafting::draft_action_plan(None, &record(&rubric, with_findings), &rubric);
    assert_eq!(plan, NOT_CONFIGURED_MESSAGE);
}

#[test]
fn drafter_errors_and_blank_output_degrade_to_fixed_messages() {
    let rubric = Rubric::embedded().expect("rubric");
    let rec = record(&rubric, with_findings);

    let failing = Scripted::new(Err("timeout"));
    assert_eq!(
        drafting::draft_action_plan(Some(&failing), &rec, &rubric),
        CONNECTION_ERROR_MESSAGE
    );

    let blank = Scripted::new(Ok("   \n"));
    assert_eq!(
        drafting::draft_action_plan(Some(&blank), &rec, &rubric),
        EMPTY_OUTPUT_MESSAGE
    );
}

#[test]
fn drafter_receives_prioritized_evidence() {
    let rubric = Rubric::embedded().expect("rubric");
    let rec = record(&rubric, with_findings);
    let drafter = Scripted::new(Ok("1. Reemplazar extintor\n"));
    let plan = drafting::draft_action_plan(Some(&drafter), &rec, &rubric);
    assert_eq!(plan, "1. Reemplazar extintor");

    let seen = drafter.seen.borrow();
    let request = &seen[0];
    assert_eq!(request.store_name, "Berel Norte");
    assert_eq!(request.evidence.len(), 2);
    assert_eq!(request.evidence[0].question_id, "1.3");
    assert_eq!(request.evidence[0].severity, Severity::Critical);
    assert!(request.evidence[0].observation_missing());
    assert_eq!(request.evidence[1].question_id, "4.2");

    let prompt = request.prompt();
    assert!(prompt.contains("\"Berel Norte\""));
    assert!(prompt.contains("[CRITICAL]"));
    assert!(prompt.contains("NO OBSERVATION RECORDED"));
    assert!(prompt.contains("extintor vencido"));
}

#[test]
fn command_drafter_is_absent_without_a_command() {
    let tmp = tempdir().expect("tempdir");
    assert!(CommandDrafter::from_config(&DraftingConfig::default(), tmp.path()).is_none());
    let blank = DraftingConfig {
        command: Some("  ".into()),
        args: Vec::new(),
    };
    assert!(CommandDrafter::from_config(&blank, tmp.path()).is_none());
}

#[cfg(unix)]
#[test]
fn command_drafter_pipes_prompt_and_logs_runs() {
    let tmp = tempdir().expect("tempdir");
    let rubric = Rubric::embedded().expect("rubric");
    let rec = record(&rubric, with_findings);

    let config = DraftingConfig {
        command: Some("sh".into()),
        args: vec![
            "-c".into(),
            "grep -c 'Berel Norte' >/dev/null && echo '1. Revisar extintores'".into(),
        ],
    };
    let drafter = CommandDrafter::from_config(&config, tmp.path()).expect("drafter");
    let plan = drafting::draft_action_plan(Some(&drafter), &rec, &rubric);
    assert_eq!(plan, "1. Revisar extintores");

    let failing = CommandDrafter::new("sh", &["-c".into(), "cat >/dev/null; exit 3".into()], tmp.path());
    let request = DraftRequest::from_record(&rec, &rubric);
    assert!(matches!(
        failing.draft(&request),
        Err(AuditError::Drafting(_))
    ));

    let log = std::fs::read_to_string(tmp.path().join(schemas::DRAFTING_EVENTS_NAME))
        .expect("drafting log");
    let statuses: Vec<String> = log
        .lines()
        .map(|l| {
            serde_json::from_str::<serde_json::Value>(l).expect("json line")["status"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(statuses, vec!["success", "error"]);
}

#[cfg(unix)]
#[test]
fn command_drafter_that_ignores_its_input_is_reaped_and_logged() {
    let tmp = tempdir().expect("tempdir");
    let rubric = Rubric::embedded().expect("rubric");
    let rec = record(&rubric, with_findings);
    let mut request = DraftRequest::from_record(&rec, &rubric);
    // Larger than any pipe buffer, so the write cannot finish before the program exits.
    request.store_name = "Berel Norte ".repeat(100_000);

    let drafter = CommandDrafter::new("sh", &["-c".into(), "exit 0".into()], tmp.path());
    let err = drafter.draft(&request).expect_err("broken pipe");
    assert!(matches!(err, AuditError::Drafting(ref msg) if msg.contains("did not accept the prompt")));

    let log = std::fs::read_to_string(tmp.path().join(schemas::DRAFTING_EVENTS_NAME))
        .expect("drafting log");
    let events: Vec<serde_json::Value> = log
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["status"], "write_error");
    assert_eq!(events[0]["exit_code"], 0);
}

#[test]
fn command_drafter_reports_missing_program() {
    let tmp = tempdir().expect("tempdir");
    let rubric = Rubric::embedded().expect("rubric");
    let rec = record(&rubric, with_findings);
    let drafter = CommandDrafter::new("storeaudit-no-such-drafter", &[], tmp.path());
    assert_eq!(
        drafting::draft_action_plan(Some(&drafter), &rec, &rubric),
        CONNECTION_ERROR_MESSAGE
    );
}
