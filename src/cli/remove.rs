//! taskdeck rm and clear

use crate::cli::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::record::{RecordId, RecordKind};

/// Result of rm command
#[derive(serde::Serialize)]
struct RmReport {
    id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<RecordKind>,
    cascaded: Vec<RecordId>,
}

/// Result of clear command
#[derive(serde::Serialize)]
struct ClearReport {
    target: String,
    removed: usize,
    remaining: usize,
}

/// Run the rm command. Unknown ids are reported, not rejected.
pub fn run_rm(ctx: &Context, id: RecordId) -> Result<()> {
    let mut store = ctx.open_store()?;
    let cascaded: Vec<RecordId> = store
        .store()
        .subtasks_of(id)
        .iter()
        .filter_map(|subtask| subtask.id)
        .collect();

    let kind = store.remove_id(id)?;
    let cascaded = if kind == Some(RecordKind::Epic) {
        cascaded
    } else {
        Vec::new()
    };

    let mut human = match kind {
        Some(kind) => HumanOutput::new(format!(
            "Removed {} {id}",
            kind.to_string().to_lowercase()
        )),
        None => {
            let mut human = HumanOutput::new("Nothing removed");
            human.push_warning(format!("no record with id {id}"));
            human
        }
    };
    for subtask in &cascaded {
        human.push_detail(format!("subtask {subtask}"));
    }

    emit_success(
        ctx.output(),
        "rm",
        &RmReport { id, kind, cascaded },
        Some(&human),
    )
}

/// Run the clear command for one kind or `all`
pub fn run_clear(ctx: &Context, target: &str) -> Result<()> {
    let kind: Option<RecordKind> = if target.trim().eq_ignore_ascii_case("all") {
        None
    } else {
        Some(target.parse()?)
    };

    let mut store = ctx.open_store()?;
    let before = store.store().len();
    match kind {
        Some(kind) => store.clear_kind(kind)?,
        None => store.clear_all()?,
    }
    let remaining = store.store().len();

    let target = kind
        .map(|kind| kind.to_string().to_lowercase())
        .unwrap_or_else(|| "all".to_string());
    let removed = before - remaining;

    let mut human = HumanOutput::new(format!("Cleared {target}"));
    human.push_summary("removed", removed);
    human.push_summary("remaining", remaining);

    emit_success(
        ctx.output(),
        "clear",
        &ClearReport {
            target,
            removed,
            remaining,
        },
        Some(&human),
    )
}
