//! taskdeck read-only commands: show, list, subtasks, prioritized, dump

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::record::{Record, RecordId, RecordKind};

/// Result of show command
#[derive(serde::Serialize)]
struct ShowReport {
    records: Vec<Record>,
    missing: Vec<RecordId>,
    recently_viewed: Vec<RecordId>,
}

/// Result of list-style commands
#[derive(serde::Serialize)]
struct ListReport {
    count: usize,
    records: Vec<Record>,
}

/// Run the show command
///
/// Records are fetched through the store, so each hit moves to the newest
/// end of the view history.
pub fn run_show(ctx: &Context, ids: &[RecordId]) -> Result<()> {
    let mut store = ctx.open_store()?;

    let mut records = Vec::new();
    let mut missing = Vec::new();
    for &id in ids {
        match store.find(id) {
            Some(record) => records.push(record),
            None => missing.push(id),
        }
    }
    let recently_viewed = store.store().recency_snapshot();

    let mut human = HumanOutput::new(format!("Showing {} record(s)", records.len()));
    if !recently_viewed.is_empty() {
        human.push_summary("recently viewed", join_ids(&recently_viewed));
    }
    for record in &records {
        human.push_detail(record.to_string());
        if let Record::Epic(epic) = record {
            for id in epic.subtask_ids() {
                if let Some(subtask) = store.store().peek(RecordKind::Subtask, *id) {
                    human.push_detail(format!("  {subtask}"));
                }
            }
        }
    }
    for id in &missing {
        human.push_warning(format!("no record with id {id}"));
    }

    emit_success(
        ctx.output(),
        "show",
        &ShowReport {
            records,
            missing,
            recently_viewed,
        },
        Some(&human),
    )
}

/// Run the list command
pub fn run_list(ctx: &Context, kind: Option<&str>) -> Result<()> {
    let kind: Option<RecordKind> = kind.map(str::parse).transpose()?;
    let store = ctx.open_store()?;

    let records: Vec<Record> = store
        .store()
        .records()
        .into_iter()
        .filter(|record| kind.map_or(true, |kind| record.kind() == kind))
        .collect();

    emit_list(ctx, "list", records, |record| record.to_string())
}

/// Run the subtasks command
pub fn run_subtasks(ctx: &Context, epic: RecordId) -> Result<()> {
    let store = ctx.open_store()?;
    if store.store().peek(RecordKind::Epic, epic).is_none() {
        return Err(Error::RecordNotFound {
            kind: RecordKind::Epic,
            id: epic,
        });
    }

    let records: Vec<Record> = store
        .store()
        .subtasks_of(epic)
        .into_iter()
        .cloned()
        .map(Record::Subtask)
        .collect();

    emit_list(ctx, "subtasks", records, |record| record.to_string())
}

/// Run the prioritized command
pub fn run_prioritized(ctx: &Context, ascending: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let records = store.store().prioritized(ascending);

    emit_list(ctx, "prioritized", records, |record| match record.interval() {
        Some((start, end)) => format!(
            "{} .. {}  {record}",
            start.format("%Y-%m-%dT%H:%M"),
            end.format("%Y-%m-%dT%H:%M")
        ),
        None => record.to_string(),
    })
}

/// Run the dump command: one line per record, no decoration
pub fn run_dump(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let lines = store.store().dump();

    emit_success(ctx.output(), "dump", &lines, None)?;
    if !ctx.json && !ctx.quiet {
        for line in &lines {
            println!("{line}");
        }
    }
    Ok(())
}

fn emit_list(
    ctx: &Context,
    command: &str,
    records: Vec<Record>,
    line: impl Fn(&Record) -> String,
) -> Result<()> {
    let mut human = HumanOutput::new(format!("{} record(s)", records.len()));
    for record in &records {
        human.push_detail(line(record));
    }

    emit_success(
        ctx.output(),
        command,
        &ListReport {
            count: records.len(),
            records,
        },
        Some(&human),
    )
}

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
