//! taskdeck task/epic/subtask add and update

use crate::cli::{Context, ItemArgs};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::record::{
    parse_duration, parse_start, Epic, Record, RecordId, RecordKind, Schedule, Status, SubTask,
    Task,
};

/// Options for the add commands
pub struct AddOptions {
    pub kind: RecordKind,
    pub epic: Option<RecordId>,
    pub item: ItemArgs,
}

/// Options for the update commands
pub struct UpdateOptions {
    pub kind: RecordKind,
    pub id: RecordId,
    pub epic: Option<RecordId>,
    pub item: ItemArgs,
}

/// Result of an add or update command
#[derive(serde::Serialize)]
struct RecordReport {
    action: &'static str,
    record: Record,
}

/// Run an add command
pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let AddOptions { kind, epic, item } = options;

    let name = item
        .name
        .clone()
        .ok_or_else(|| Error::InvalidArgument("--name is required".to_string()))?;
    let description = item.description.clone().unwrap_or_default();
    let status = parse_status(item.status.as_deref())?.unwrap_or_default();
    let schedule = parse_schedule(&item)?;

    let mut store = ctx.open_store()?;
    let id = match kind {
        RecordKind::Task => {
            let mut task = Task::new(name, description, status);
            task.schedule = schedule;
            store.create_task(task)?
        }
        RecordKind::Epic => store.create_epic(Epic::new(name, description))?,
        RecordKind::Subtask => {
            let epic_id = epic
                .ok_or_else(|| Error::InvalidArgument("--epic is required".to_string()))?;
            let mut subtask = SubTask::new(epic_id, name, description, status);
            subtask.schedule = schedule;
            store
                .create_subtask(subtask)?
                .ok_or(Error::RecordNotFound {
                    kind: RecordKind::Epic,
                    id: epic_id,
                })?
        }
    };

    let record = store
        .store()
        .peek(kind, id)
        .ok_or(Error::RecordNotFound { kind, id })?;
    report(ctx, kind, "created", record)
}

/// Run an update command. Flags that were not given keep the stored value.
pub fn run_update(ctx: &Context, options: UpdateOptions) -> Result<()> {
    let UpdateOptions {
        kind,
        id,
        epic,
        item,
    } = options;

    let status = parse_status(item.status.as_deref())?;
    let schedule = parse_schedule(&item)?;

    let mut store = ctx.open_store()?;
    let mut record = store
        .store()
        .peek(kind, id)
        .ok_or(Error::RecordNotFound { kind, id })?;

    match &mut record {
        Record::Task(task) => {
            patch_text(&item, &mut task.name, &mut task.description);
            if let Some(status) = status {
                task.status = status;
            }
            patch_schedule(&item, schedule, &mut task.schedule);
        }
        Record::Epic(epic) => {
            patch_text(&item, &mut epic.name, &mut epic.description);
        }
        Record::Subtask(subtask) => {
            patch_text(&item, &mut subtask.name, &mut subtask.description);
            if let Some(status) = status {
                subtask.status = status;
            }
            if let Some(epic_id) = epic {
                subtask.epic_id = epic_id;
            }
            patch_schedule(&item, schedule, &mut subtask.schedule);
        }
    }

    let target_epic = record.epic_id();
    if !store.update(record)? {
        return Err(match target_epic {
            Some(epic_id) => Error::RecordNotFound {
                kind: RecordKind::Epic,
                id: epic_id,
            },
            None => Error::RecordNotFound { kind, id },
        });
    }

    let record = store
        .store()
        .peek(kind, id)
        .ok_or(Error::RecordNotFound { kind, id })?;
    report(ctx, kind, "updated", record)
}

fn report(ctx: &Context, kind: RecordKind, action: &'static str, record: Record) -> Result<()> {
    let noun = kind.to_string().to_lowercase();
    let command = match action {
        "created" => format!("{noun} add"),
        _ => format!("{noun} update"),
    };

    let mut human = HumanOutput::new(format!(
        "{} {} {}",
        capitalize(action),
        noun,
        record.id().unwrap_or_default()
    ));
    human.push_summary("status", record.status());
    if let Some((start, end)) = record.interval() {
        human.push_summary(
            "window",
            format!(
                "{} .. {}",
                start.format("%Y-%m-%dT%H:%M"),
                end.format("%Y-%m-%dT%H:%M")
            ),
        );
    }
    if let Some(epic_id) = record.epic_id() {
        human.push_summary("epic", epic_id);
    }
    human.push_detail(record.to_string());

    emit_success(
        ctx.output(),
        &command,
        &RecordReport { action, record },
        Some(&human),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_status(value: Option<&str>) -> Result<Option<Status>> {
    value.map(str::parse).transpose()
}

/// Build the schedule given by `--start` and `--duration`, if any
fn parse_schedule(item: &ItemArgs) -> Result<Option<Schedule>> {
    match (&item.start, &item.duration) {
        (Some(start), Some(duration)) => {
            Schedule::new(parse_start(start)?, parse_duration(duration)?).map(Some)
        }
        (None, None) => Ok(None),
        _ => Err(Error::InvalidArgument(
            "--start and --duration must be given together".to_string(),
        )),
    }
}

fn patch_text(item: &ItemArgs, name: &mut String, description: &mut String) {
    if let Some(value) = &item.name {
        name.clone_from(value);
    }
    if let Some(value) = &item.description {
        description.clone_from(value);
    }
}

fn patch_schedule(item: &ItemArgs, parsed: Option<Schedule>, target: &mut Option<Schedule>) {
    if item.unschedule {
        *target = None;
    } else if parsed.is_some() {
        *target = parsed;
    }
}
