//! storeaudit: scored retail store audits.
//!
//! An auditor walks a store with a fixed rubric, scores every criterion, and closes the
//! audit with two signatures (store manager first, auditor second). The signed audit is
//! sealed into a [`audit::record::FinalizedAuditRecord`], classified into a status tier,
//! saved to SQLite and rendered as a report.
//!
//! # Architecture
//!
//! - [`audit`]: the domain. Rubric, session state machine, progress and validation,
//!   signature sequencing, scoring, findings and report/CSV derivation.
//! - [`plugins`]: collaborators around a sealed record: SQLite storage, the pending
//!   directory for records awaiting a retry, action-plan drafting through an external
//!   command, and the passphrase-gated admin console.
//! - [`core`]: errors, configuration, the database broker, time helpers, embedded assets.
//!
//! All database access routes through `DbBroker`, which serializes connections and
//! appends every operation to `broker.events.jsonl`.
//!
//! # Examples
//!
//! ```bash
//! storeaudit init
//! storeaudit audit --store 1 --manager 2 --auditor 1 --answers answers.toml \
//!     --manager-signature manager.json --auditor-signature auditor.json
//! storeaudit history --passphrase "$PASS" list --status CRITICAL
//! ```

pub mod audit;
pub mod core;
pub mod plugins;

mod cli;

use crate::audit::directory::{self, MasterDirectory, Person, PersonRole, StoreEntry};
use crate::audit::folio::Folio;
use crate::audit::handoff::{Handoff, PersistenceState};
use crate::audit::record::FinalizedAuditRecord;
use crate::audit::rubric::Rubric;
use crate::audit::scoring::AuditStatus;
use crate::audit::session::{AuditSession, SignOff};
use crate::audit::signature::{Point, Stroke};
use crate::audit::{export, report};
use crate::cli::{
    AuditCli, Cli, Command, FilterArgs, HistoryCli, HistoryCommand, MasterCli, MasterCommand,
    PersonCommand, StoreCommand,
};
use crate::core::{
    config::{self, AuditConfig},
    error,
    output,
    store::{PROJECT_DIR_NAME, Store},
    time,
};
use crate::plugins::admin::{self, HistoryFilter};
use crate::plugins::drafting::{self, ActionPlanDrafter, CommandDrafter};
use crate::plugins::pending;
use crate::plugins::storage::SqliteStorage;

use clap::Parser;
use colored::Colorize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Walk up from `start_dir` to the first directory holding `.storeaudit/`.
pub fn find_project_root(start_dir: &Path) -> Result<PathBuf, error::AuditError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(PROJECT_DIR_NAME).exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(error::AuditError::NotFound(format!(
                "'{}' directory not found in current or parent directories. Run `storeaudit init` first.",
                PROJECT_DIR_NAME
            )));
        }
    }
}

struct Project {
    root: PathBuf,
    config: AuditConfig,
    store: Store,
}

impl Project {
    /// Open the enclosing project. Without one, `required == false` falls back to the
    /// current directory with default configuration.
    fn open(required: bool) -> Result<Self, error::AuditError> {
        let cwd = std::env::current_dir()?;
        let root = match find_project_root(&cwd) {
            Ok(root) => root,
            Err(e) if required => return Err(e),
            Err(_) => cwd,
        };
        let config = config::load_config(&root)?;
        Ok(Self {
            store: Store::for_project(&root),
            root,
            config,
        })
    }

    fn rubric(&self) -> Result<Rubric, error::AuditError> {
        Rubric::load(self.config.rubric_path(&self.root).as_deref())
    }

    fn storage(&self) -> SqliteStorage {
        SqliteStorage::new(&self.store.root)
    }
}

fn wants_json(format: &str) -> Result<bool, error::AuditError> {
    match format {
        "json" => Ok(true),
        "text" => Ok(false),
        other => Err(error::AuditError::Validation(format!(
            "unknown format '{}' (expected 'text' or 'json')",
            other
        ))),
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), error::AuditError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status_colored(status: AuditStatus) -> colored::ColoredString {
    match status {
        AuditStatus::ModelStore => status.label().bright_green().bold(),
        AuditStatus::Acceptable => status.label().bright_yellow().bold(),
        AuditStatus::Critical => status.label().bright_red().bold(),
    }
}

#[derive(Debug, Deserialize)]
struct AnswerInput {
    #[serde(default)]
    score: u32,
    #[serde(default)]
    observation: Option<String>,
}

/// Answers file: JSON when the extension says so, TOML otherwise.
fn load_answer_sheet(path: &Path) -> Result<BTreeMap<String, AnswerInput>, error::AuditError> {
    let raw = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&raw)?)
    } else {
        Ok(toml::from_str(&raw)?)
    }
}

fn load_strokes(path: &Path) -> Result<Vec<Stroke>, error::AuditError> {
    let raw = fs::read_to_string(path)?;
    let strokes: Vec<Vec<[f32; 2]>> = serde_json::from_str(&raw)?;
    Ok(strokes
        .into_iter()
        .map(|points| Stroke {
            points: points.into_iter().map(|[x, y]| Point::new(x, y)).collect(),
        })
        .collect())
}

/// Feed each party's strokes to the sequencer in order and confirm them.
fn sign_off(
    mut session: AuditSession,
    signatures: [Vec<Stroke>; 2],
) -> Result<FinalizedAuditRecord, error::AuditError> {
    for strokes in signatures {
        if let Some(sequencer) = session.signing_mut() {
            sequencer.surface_mut().load_strokes(strokes);
        }
        session = match session.confirm_signature() {
            Ok(SignOff::Pending(next)) => next,
            Ok(SignOff::Finalized(record)) => return Ok(record),
            Err(rejected) => return Err(rejected.error),
        };
    }
    Err(error::AuditError::SigningNotStarted)
}

fn load_directory_or_sample(storage: &SqliteStorage) -> MasterDirectory {
    match storage.load_directory() {
        Ok(dir) if !dir.is_empty() => dir,
        Ok(_) => directory::sample_directory(),
        Err(e) => {
            tracing::warn!(error = %e, "master lists unavailable; using the built-in sample directory");
            directory::sample_directory()
        }
    }
}

fn run_init(dir: Option<PathBuf>) -> Result<(), error::AuditError> {
    let root = match dir {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    fs::create_dir_all(&root)?;

    let wrote_config = config::write_default_config(&root)?;
    let store = Store::for_project(&root);
    let storage = SqliteStorage::new(&store.root);
    storage.initialize()?;
    let seeded = storage.seed_master_data()?;

    println!(
        "  {} {}",
        "▸".bright_cyan(),
        format!("storeaudit project at {}", root.display()).bright_white().bold()
    );
    let config_note = if wrote_config {
        "created".bright_green()
    } else {
        "(preserved - existing config kept)".bright_black()
    };
    println!("    {} config.toml {}", "●".bright_green(), config_note);
    println!("    {} audits.db", "●".bright_green());
    if seeded {
        println!("    {} sample stores and people loaded", "●".bright_green());
    }
    Ok(())
}

fn run_rubric(project: &Project, format: &str) -> Result<(), error::AuditError> {
    let rubric = project.rubric()?;
    if wants_json(format)? {
        return print_json(&serde_json::json!({
            "total_points": rubric.total_points(),
            "sections": rubric.sections(),
        }));
    }
    for section in rubric.sections() {
        println!(
            "{} {} ({} pts)",
            section.id.to_string().bright_cyan().bold(),
            section.title.bright_white().bold(),
            section.max_points
        );
        for q in &section.questions {
            let options = q
                .options
                .iter()
                .map(|o| format!("{}={}", o.value, o.label))
                .collect::<Vec<_>>()
                .join(" | ");
            println!(
                "  {} {} [{}] {}",
                output::column(&q.id, 5),
                output::column(&q.category, 24),
                q.max_points,
                q.criterion
            );
            println!("        {}", options.bright_black());
        }
    }
    println!("Total: {} pts", rubric.total_points());
    Ok(())
}

fn run_audit(project: &Project, args: AuditCli) -> Result<(), error::AuditError> {
    let json = wants_json(&args.format)?;
    let rubric = project.rubric()?;
    let storage = project.storage();
    let directory = load_directory_or_sample(&storage);

    let (today, now) = time::local_now();
    let date = match args.date.as_deref() {
        Some(raw) => time::parse_date(raw)?,
        None => today,
    };
    let time_of_day = match args.time.as_deref() {
        Some(raw) => time::parse_time(raw)?,
        None => now,
    };

    let mut session = AuditSession::start(&rubric, date, time_of_day, &mut rand::thread_rng());

    let store_name = directory
        .store(&args.store)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| args.store.clone());
    session.select_store(&args.store, &store_name)?;
    let person_name = |id: &str, role: PersonRole| {
        directory
            .person(id, role)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    session.select_manager(&args.manager, &person_name(&args.manager, PersonRole::Manager))?;
    session.select_auditor(&args.auditor, &person_name(&args.auditor, PersonRole::Auditor))?;

    for (question_id, input) in load_answer_sheet(&args.answers)? {
        session.set_score(&rubric, &question_id, input.score)?;
        if let Some(observation) = input.observation {
            session.set_observation(&rubric, &question_id, &observation)?;
        }
    }

    session.request_submit(&rubric, &directory)?;
    let signatures = [
        load_strokes(&args.manager_signature)?,
        load_strokes(&args.auditor_signature)?,
    ];
    let record = sign_off(session, signatures)?;

    // Hand off before any drafting runs.
    let mut handoff = Handoff::new(record);
    handoff.attempt(&storage);

    if args.plan {
        let drafter = CommandDrafter::from_config(&project.config.drafting, &project.store.root);
        let plan = drafting::draft_action_plan(
            drafter.as_ref().map(|d| d as &dyn ActionPlanDrafter),
            handoff.record(),
            &rubric,
        );
        handoff.attach_action_plan(&plan);
        if handoff.is_saved() {
            let folio = handoff.record().folio().as_str();
            if let Err(e) = storage.set_action_plan(folio, &plan) {
                tracing::warn!(folio = %folio, error = %e, "action plan not stored");
            }
        } else {
            handoff.attempt(&storage);
        }
    }

    let pending_file = if handoff.is_saved() {
        None
    } else {
        match pending::write_pending(&project.store.root, handoff.record()) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(folio = %handoff.record().folio(), error = %e, "pending file not written");
                None
            }
        }
    };
    let view = report::build_report(handoff.record(), &rubric, project.config.report.max_findings);

    if json {
        return print_json(&time::command_envelope(
            "audit",
            "ok",
            serde_json::json!({
                "report": view,
                "persistence": handoff.state(),
                "pending_file": pending_file,
            }),
        ));
    }

    println!("{}", view.render_text());
    match (handoff.state(), &pending_file) {
        (PersistenceState::Saved { id }, _) => println!(
            "{} audit {} saved (id {})",
            "✓".bright_green(),
            view.folio.bright_white().bold(),
            id
        ),
        (PersistenceState::NotSaved { reason }, Some(path)) => println!(
            "{} audit {} not saved: {}. Kept at {}; run `storeaudit history retry --folio {}` once storage is available.",
            "✗".bright_red(),
            view.folio.bright_white().bold(),
            reason,
            path.display(),
            view.folio
        ),
        (PersistenceState::NotSaved { reason }, None) => println!(
            "{} audit {} not saved: {}. The report above is the only copy.",
            "✗".bright_red(),
            view.folio.bright_white().bold(),
            reason
        ),
        (PersistenceState::Pending, _) => {}
    }
    println!("Status: {}", status_colored(view.status));
    Ok(())
}

/// Retry every pending record (or one folio). Saved records leave the pending directory.
fn retry_pending(
    project: &Project,
    storage: &SqliteStorage,
    folio: Option<&str>,
) -> Result<(), error::AuditError> {
    let paths = match folio {
        Some(raw) => {
            let path = pending::pending_path(&project.store.root, &Folio::parse(raw)?);
            if !path.exists() {
                return Err(error::AuditError::NotFound(format!("pending audit {}", raw)));
            }
            vec![path]
        }
        None => pending::list_pending(&project.store.root)?,
    };
    if paths.is_empty() {
        println!("No pending audits.");
        return Ok(());
    }

    let mut still_pending = 0;
    for path in paths {
        let mut handoff = Handoff::new(pending::load_pending(&path)?);
        match handoff.attempt(storage).clone() {
            PersistenceState::Saved { id } => {
                pending::clear_pending(&path)?;
                println!(
                    "{} audit {} saved (id {})",
                    "✓".bright_green(),
                    handoff.record().folio().as_str().bright_white().bold(),
                    id
                );
            }
            PersistenceState::NotSaved { reason } => {
                still_pending += 1;
                println!(
                    "{} audit {} not saved: {}",
                    "✗".bright_red(),
                    handoff.record().folio().as_str().bright_white().bold(),
                    reason
                );
            }
            PersistenceState::Pending => {}
        }
    }
    if still_pending > 0 {
        return Err(error::AuditError::Persistence(format!(
            "{} pending audit(s) still not saved",
            still_pending
        )));
    }
    Ok(())
}

fn build_filter(args: &FilterArgs) -> Result<HistoryFilter, error::AuditError> {
    Ok(HistoryFilter {
        date_from: args.from.as_deref().map(time::parse_date).transpose()?,
        date_to: args.to.as_deref().map(time::parse_date).transpose()?,
        store: args.store.clone(),
        status: args
            .status
            .as_deref()
            .map(|s| s.parse::<AuditStatus>())
            .transpose()?,
    })
}

fn run_history(project: &Project, cli: HistoryCli) -> Result<(), error::AuditError> {
    admin::authorize(&project.config, cli.auth.passphrase.as_deref())?;
    let rubric = project.rubric()?;
    let storage = project.storage();

    match cli.command {
        HistoryCommand::List { filter, format } => {
            let json = wants_json(&format)?;
            let entries = storage.list_audits(&build_filter(&filter)?)?;
            if json {
                let rows: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "id": e.id,
                            "folio": e.record.folio(),
                            "date": e.record.date().format(time::DATE_FORMAT).to_string(),
                            "time": e.record.time().format(time::TIME_FORMAT).to_string(),
                            "store": e.record.store().name,
                            "manager": e.record.manager().name,
                            "auditor": e.record.auditor().name,
                            "total_score": e.record.total_score(),
                            "status": e.record.status(),
                        })
                    })
                    .collect();
                return print_json(&serde_json::json!({ "audits": rows }));
            }
            if entries.is_empty() {
                println!("No audits match.");
                return Ok(());
            }
            for e in &entries {
                println!(
                    "{} {} {} {} {:>3}/100 {}",
                    output::column(e.record.folio().as_str(), 18).bright_white(),
                    e.record.date().format(time::DATE_FORMAT),
                    e.record.time().format(time::TIME_FORMAT),
                    output::column(&e.record.store().name, 22),
                    e.record.total_score(),
                    status_colored(e.record.status())
                );
            }
            println!("{} audit(s)", entries.len());
        }
        HistoryCommand::Show { folio, format } => {
            let json = wants_json(&format)?;
            let entry = storage.get_audit_by_folio(&folio)?;
            let view =
                report::build_report(&entry.record, &rubric, project.config.report.max_findings);
            if json {
                return print_json(&serde_json::json!({ "id": entry.id, "report": view }));
            }
            println!("{}", view.render_text());
        }
        HistoryCommand::Delete { folio } => {
            let entry = storage.get_audit_by_folio(&folio)?;
            storage.delete_audit(&entry.id)?;
            println!("{} audit {} deleted", "✓".bright_green(), folio);
        }
        HistoryCommand::Export { filter, output } => {
            let records: Vec<FinalizedAuditRecord> = storage
                .list_audits(&build_filter(&filter)?)?
                .into_iter()
                .map(|e| e.record)
                .collect();
            let csv = export::to_csv(&records, &rubric)?;
            let path = match output {
                Some(p) => p,
                None => std::env::current_dir()?
                    .join(export::export_file_name("audits", time::local_now().0)),
            };
            fs::write(&path, csv)?;
            println!(
                "{} {} audit(s) exported to {}",
                "✓".bright_green(),
                records.len(),
                path.display()
            );
        }
        HistoryCommand::Plan { folio, text } => {
            let entry = storage.get_audit_by_folio(&folio)?;
            let plan = match text {
                Some(text) => text.trim().to_string(),
                None => {
                    let drafter =
                        CommandDrafter::from_config(&project.config.drafting, &project.store.root);
                    drafting::draft_action_plan(
                        drafter.as_ref().map(|d| d as &dyn ActionPlanDrafter),
                        &entry.record,
                        &rubric,
                    )
                }
            };
            storage.set_action_plan(&folio, &plan)?;
            println!("{}", plan);
        }
        HistoryCommand::Share { folio } => {
            let entry = storage.get_audit_by_folio(&folio)?;
            println!("{}", report::share_summary(&entry.record));
        }
        HistoryCommand::Retry { folio } => retry_pending(project, &storage, folio.as_deref())?,
    }
    Ok(())
}

fn run_master(project: &Project, cli: MasterCli) -> Result<(), error::AuditError> {
    admin::authorize(&project.config, cli.auth.passphrase.as_deref())?;
    let storage = project.storage();
    storage.initialize()?;

    match cli.command {
        MasterCommand::Store { command } => match command {
            StoreCommand::Add {
                id,
                name,
                branch,
                warehouse,
            } => {
                let entry = StoreEntry {
                    id: id.unwrap_or_else(time::new_event_id),
                    name,
                    branch,
                    warehouse,
                };
                storage.add_store(&entry)?;
                println!("{} store {} ({}) added", "✓".bright_green(), entry.name, entry.id);
            }
            StoreCommand::List => {
                for s in storage.list_stores()? {
                    println!(
                        "{} {} {} {}",
                        output::column(&s.id, 28),
                        output::column(&s.name, 24),
                        output::column(&s.branch, 10),
                        s.warehouse
                    );
                }
            }
        },
        MasterCommand::Person { command } => match command {
            PersonCommand::Add {
                id,
                name,
                role,
                payroll_id,
                department,
            } => {
                let person = Person {
                    id: id.unwrap_or_else(time::new_event_id),
                    name,
                    role: role.parse()?,
                    payroll_id,
                    department,
                };
                storage.add_person(&person)?;
                println!(
                    "{} {} {} ({}) added",
                    "✓".bright_green(),
                    person.role,
                    person.name,
                    person.id
                );
            }
            PersonCommand::List { role } => {
                let role = role.as_deref().map(str::parse::<PersonRole>).transpose()?;
                for p in storage.list_people(role)? {
                    println!(
                        "{} {} {} {} {}",
                        output::column(&p.id, 28),
                        output::column(&p.name, 24),
                        output::column(p.role.as_str(), 8),
                        output::column(&p.payroll_id, 8),
                        p.department
                    );
                }
            }
        },
    }
    Ok(())
}

pub fn run() -> Result<(), error::AuditError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { dir } => run_init(dir),
        Command::Rubric { format } => run_rubric(&Project::open(false)?, &format),
        Command::Audit(args) => run_audit(&Project::open(false)?, args),
        Command::History(history) => run_history(&Project::open(true)?, history),
        Command::Master(master) => run_master(&Project::open(true)?, master),
    }
}
