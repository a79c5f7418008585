//! Epic rollup: status and time window derived from an epic's subtasks.

use chrono::{Duration, NaiveDateTime};

use crate::record::{Status, SubTask};

/// Derived fields of an epic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpicRollup {
    pub status: Status,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub duration: Duration,
}

impl Default for EpicRollup {
    fn default() -> Self {
        Self {
            status: Status::New,
            start: None,
            end: None,
            duration: Duration::zero(),
        }
    }
}

/// Compute an epic's status and window from a snapshot of its subtasks.
///
/// No subtasks yields `NEW` with an empty window. Otherwise the status is
/// `DONE` when every subtask is done, `NEW` when every subtask is new, and
/// `IN_PROGRESS` for any other mix. Unscheduled subtasks count towards the
/// status but not the window.
pub fn rollup<'a, I>(subtasks: I) -> EpicRollup
where
    I: IntoIterator<Item = &'a SubTask>,
{
    let mut rollup = EpicRollup::default();
    let mut total = 0usize;
    let mut done = 0usize;
    let mut new = 0usize;

    for subtask in subtasks {
        total += 1;
        match subtask.status {
            Status::Done => done += 1,
            Status::New => new += 1,
            Status::InProgress => {}
        }

        let Some(schedule) = subtask.schedule else {
            continue;
        };
        rollup.start = Some(match rollup.start {
            Some(start) => start.min(schedule.start),
            None => schedule.start,
        });
        rollup.end = Some(match rollup.end {
            Some(end) => end.max(schedule.end()),
            None => schedule.end(),
        });
        rollup.duration = rollup
            .duration
            .checked_add(&schedule.duration())
            .unwrap_or_else(Duration::max_value);
    }

    rollup.status = if total == 0 || new == total {
        Status::New
    } else if done == total {
        Status::Done
    } else {
        Status::InProgress
    };

    rollup
}
