//! CLI struct definitions for the storeaudit command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "storeaudit",
    version = env!("CARGO_PKG_VERSION"),
    about = "Scored retail store audits: rubric entry, two-party sign-off, status tiers and audit history."
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create `.storeaudit/` with config, database and sample master data
    Init {
        /// Project directory (defaults to the current directory)
        #[clap(long)]
        dir: Option<PathBuf>,
    },
    /// Show the rubric in effect
    Rubric {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Run one audit end to end: score, submit, sign, save and report
    Audit(AuditCli),
    /// Admin console over saved audits
    History(HistoryCli),
    /// Admin maintenance of the store and people master lists
    Master(MasterCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct AuditCli {
    /// Store id from the master list
    #[clap(long)]
    pub store: String,
    /// Manager (Gerente) id from the master list
    #[clap(long)]
    pub manager: String,
    /// Auditor id from the master list
    #[clap(long)]
    pub auditor: String,
    /// Answers file (TOML or JSON): question id -> { score, observation }
    #[clap(long)]
    pub answers: PathBuf,
    /// Manager signature strokes (JSON array of strokes of [x, y] points)
    #[clap(long)]
    pub manager_signature: PathBuf,
    /// Auditor signature strokes (JSON array of strokes of [x, y] points)
    #[clap(long)]
    pub auditor_signature: PathBuf,
    /// Audit date YYYY-MM-DD (defaults to today)
    #[clap(long)]
    pub date: Option<String>,
    /// Audit time HH:MM (defaults to now)
    #[clap(long)]
    pub time: Option<String>,
    /// Draft an action plan with the configured drafting command
    #[clap(long)]
    pub plan: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct AdminAuth {
    /// Admin console passphrase
    #[clap(long, global = true)]
    pub passphrase: Option<String>,
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct FilterArgs {
    /// Earliest audit date (YYYY-MM-DD, inclusive)
    #[clap(long)]
    pub from: Option<String>,
    /// Latest audit date (YYYY-MM-DD, inclusive)
    #[clap(long)]
    pub to: Option<String>,
    /// Case-insensitive store name fragment
    #[clap(long)]
    pub store: Option<String>,
    /// MODEL_STORE, ACCEPTABLE or CRITICAL
    #[clap(long)]
    pub status: Option<String>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct HistoryCli {
    #[clap(flatten)]
    pub auth: AdminAuth,
    #[clap(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum HistoryCommand {
    /// List saved audits, newest first
    List {
        #[clap(flatten)]
        filter: FilterArgs,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Show the report of one audit
    Show {
        #[clap(long)]
        folio: String,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Delete one audit and its answers
    Delete {
        #[clap(long)]
        folio: String,
    },
    /// Export matching audits as CSV
    Export {
        #[clap(flatten)]
        filter: FilterArgs,
        /// Destination file (defaults to audits_<date>.csv in the current directory)
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Draft (or set) the action plan of a saved audit
    Plan {
        #[clap(long)]
        folio: String,
        /// Store this text instead of drafting one
        #[clap(long)]
        text: Option<String>,
    },
    /// Print a short shareable summary of an audit
    Share {
        #[clap(long)]
        folio: String,
    },
    /// Save audits kept in the pending directory after a failed save
    Retry {
        /// Only this folio (defaults to every pending audit)
        #[clap(long)]
        folio: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct MasterCli {
    #[clap(flatten)]
    pub auth: AdminAuth,
    #[clap(subcommand)]
    pub command: MasterCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum MasterCommand {
    /// Stores master list
    Store {
        #[clap(subcommand)]
        command: StoreCommand,
    },
    /// People master list (auditors and managers)
    Person {
        #[clap(subcommand)]
        command: PersonCommand,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum StoreCommand {
    Add {
        /// Store id (generated when omitted)
        #[clap(long)]
        id: Option<String>,
        #[clap(long)]
        name: String,
        #[clap(long, default_value = "")]
        branch: String,
        #[clap(long, default_value = "")]
        warehouse: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PersonCommand {
    Add {
        /// Person id (generated when omitted)
        #[clap(long)]
        id: Option<String>,
        #[clap(long)]
        name: String,
        /// 'Auditor' or 'Gerente'
        #[clap(long)]
        role: String,
        #[clap(long, default_value = "")]
        payroll_id: String,
        #[clap(long, default_value = "")]
        department: String,
    },
    List {
        /// Only this role ('Auditor' or 'Gerente')
        #[clap(long)]
        role: Option<String>,
    },
}
