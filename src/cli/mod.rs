//! Command-line interface for taskdeck
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in the submodules.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::record::{RecordId, RecordKind};
use crate::storage::FileStore;

mod query;
mod record;
mod remove;

/// taskdeck - tasks, epics and subtasks with conflict-free scheduling
///
/// Every command loads the snapshot file, applies one operation and saves
/// the file again when something changed.
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Snapshot file (defaults to storage.file from .taskdeck.toml)
    #[arg(long, global = true, env = "TASKDECK_FILE")]
    pub file: Option<PathBuf>,

    /// Configuration file (defaults to ./.taskdeck.toml)
    #[arg(long, global = true, env = "TASKDECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Standalone tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Epics (status and schedule come from their subtasks)
    #[command(subcommand)]
    Epic(EpicCommands),

    /// Subtasks owned by an epic
    #[command(subcommand)]
    Subtask(SubtaskCommands),

    /// Show records by id, in the order given
    Show {
        /// Record ids
        #[arg(required = true)]
        ids: Vec<RecordId>,
    },

    /// List records
    List {
        /// Only this kind: task, epic, subtask
        #[arg(long)]
        kind: Option<String>,
    },

    /// List the subtasks of an epic
    Subtasks {
        /// Epic id
        epic: RecordId,
    },

    /// Scheduled records ordered by start time
    Prioritized {
        /// Latest first
        #[arg(long)]
        desc: bool,
    },

    /// Print every record, one line each
    Dump,

    /// Remove a record (removing an epic removes its subtasks)
    Rm {
        /// Record id
        id: RecordId,
    },

    /// Remove all records of a kind, or everything with "all"
    Clear {
        /// task, epic, subtask or all
        target: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        #[command(flatten)]
        item: ItemArgs,
    },

    /// Change a task
    Update {
        /// Task id
        id: RecordId,

        #[command(flatten)]
        item: ItemArgs,
    },
}

/// Epic subcommands
#[derive(Subcommand, Debug)]
pub enum EpicCommands {
    /// Create an epic
    Add {
        /// Epic name
        #[arg(long)]
        name: String,

        /// Epic description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Rename or re-describe an epic
    Update {
        /// Epic id
        id: RecordId,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,
    },
}

/// Subtask subcommands
#[derive(Subcommand, Debug)]
pub enum SubtaskCommands {
    /// Create a subtask under an epic
    Add {
        /// Owning epic id
        #[arg(long)]
        epic: RecordId,

        #[command(flatten)]
        item: ItemArgs,
    },

    /// Change a subtask, optionally moving it to another epic
    Update {
        /// Subtask id
        id: RecordId,

        /// Move to this epic
        #[arg(long)]
        epic: Option<RecordId>,

        #[command(flatten)]
        item: ItemArgs,
    },
}

/// Fields shared by tasks and subtasks
#[derive(Args, Debug, Default)]
pub struct ItemArgs {
    /// Name (required when adding)
    #[arg(long)]
    pub name: Option<String>,

    /// Description
    #[arg(long)]
    pub description: Option<String>,

    /// Status: NEW, IN_PROGRESS, DONE
    #[arg(long)]
    pub status: Option<String>,

    /// Start time, e.g. 2024-10-21T19:00
    #[arg(long, requires = "duration")]
    pub start: Option<String>,

    /// Duration, e.g. 90m, 2h (bare numbers are minutes)
    #[arg(long, requires = "start")]
    pub duration: Option<String>,

    /// Drop the schedule
    #[arg(long, conflicts_with_all = ["start", "duration"])]
    pub unschedule: bool,
}

/// Global options every command needs
#[derive(Debug, Clone)]
pub struct Context {
    pub file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl Context {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path),
            None => {
                let cwd = std::env::current_dir()?;
                Config::load_from_dir(&cwd)
            }
        }
    }

    /// Open the snapshot named by `--file` or the configuration
    pub fn open_store(&self) -> Result<FileStore> {
        let config = self.load_config()?;
        let path = self
            .file
            .clone()
            .unwrap_or_else(|| config.storage.file.clone());
        FileStore::open(path, config.history.tracker()?)
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let ctx = Context {
            file: self.file,
            config: self.config,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add { item } => record::run_add(
                    &ctx,
                    record::AddOptions {
                        kind: RecordKind::Task,
                        epic: None,
                        item,
                    },
                ),
                TaskCommands::Update { id, item } => record::run_update(
                    &ctx,
                    record::UpdateOptions {
                        kind: RecordKind::Task,
                        id,
                        epic: None,
                        item,
                    },
                ),
            },
            Commands::Epic(cmd) => match cmd {
                EpicCommands::Add { name, description } => record::run_add(
                    &ctx,
                    record::AddOptions {
                        kind: RecordKind::Epic,
                        epic: None,
                        item: ItemArgs {
                            name: Some(name),
                            description: Some(description),
                            ..ItemArgs::default()
                        },
                    },
                ),
                EpicCommands::Update {
                    id,
                    name,
                    description,
                } => record::run_update(
                    &ctx,
                    record::UpdateOptions {
                        kind: RecordKind::Epic,
                        id,
                        epic: None,
                        item: ItemArgs {
                            name,
                            description,
                            ..ItemArgs::default()
                        },
                    },
                ),
            },
            Commands::Subtask(cmd) => match cmd {
                SubtaskCommands::Add { epic, item } => record::run_add(
                    &ctx,
                    record::AddOptions {
                        kind: RecordKind::Subtask,
                        epic: Some(epic),
                        item,
                    },
                ),
                SubtaskCommands::Update { id, epic, item } => record::run_update(
                    &ctx,
                    record::UpdateOptions {
                        kind: RecordKind::Subtask,
                        id,
                        epic,
                        item,
                    },
                ),
            },
            Commands::Show { ids } => query::run_show(&ctx, &ids),
            Commands::List { kind } => query::run_list(&ctx, kind.as_deref()),
            Commands::Subtasks { epic } => query::run_subtasks(&ctx, epic),
            Commands::Prioritized { desc } => query::run_prioritized(&ctx, !desc),
            Commands::Dump => query::run_dump(&ctx),
            Commands::Rm { id } => remove::run_rm(&ctx, id),
            Commands::Clear { target } => remove::run_clear(&ctx, &target),
        }
    }
}
