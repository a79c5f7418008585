//! Record model: tasks, epics and subtasks
//!
//! Every record shares an id, a name, a description and a status. Tasks and
//! subtasks carry an optional [`Schedule`]; an epic's status and time window
//! are derived from its subtasks and can only be changed by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::aggregate::EpicRollup;
use crate::error::{Error, Result};

/// Record identifier, unique across all record kinds
pub type RecordId = u64;

const START_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

// =============================================================================
// Status
// =============================================================================

/// Progress of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Done,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::New => write!(f, "NEW"),
            Status::InProgress => write!(f, "IN_PROGRESS"),
            Status::Done => write!(f, "DONE"),
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "NEW" => Ok(Status::New),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid status '{}'. Expected: NEW, IN_PROGRESS, DONE",
                s
            ))),
        }
    }
}

// =============================================================================
// Kind
// =============================================================================

/// The three record variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    Task,
    Epic,
    Subtask,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Task, RecordKind::Epic, RecordKind::Subtask];
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Task => write!(f, "TASK"),
            RecordKind::Epic => write!(f, "EPIC"),
            RecordKind::Subtask => write!(f, "SUBTASK"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task" | "tasks" => Ok(RecordKind::Task),
            "epic" | "epics" => Ok(RecordKind::Epic),
            "subtask" | "subtasks" | "sub" => Ok(RecordKind::Subtask),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid record kind '{}'. Expected: task, epic, subtask",
                s
            ))),
        }
    }
}

// =============================================================================
// Schedule
// =============================================================================

/// A start time plus a non-negative duration.
///
/// Covers the half-open interval `[start, start + duration)`; a zero duration
/// covers nothing and never conflicts with another schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: NaiveDateTime,
    #[serde(rename = "duration_minutes", with = "minutes")]
    duration: Duration,
}

impl Schedule {
    pub fn new(start: NaiveDateTime, duration: Duration) -> Result<Self> {
        if duration < Duration::zero() {
            return Err(Error::InvalidArgument(format!(
                "Duration cannot be negative: {}m",
                duration.num_minutes()
            )));
        }
        if start.checked_add_signed(duration).is_none() {
            return Err(Error::InvalidArgument(format!(
                "Duration of {}m starting {} runs past the supported calendar",
                duration.num_minutes(),
                start.format("%Y-%m-%dT%H:%M")
            )));
        }
        Ok(Self { start, duration })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// End of the slot; saturates at the last representable instant
    pub fn end(&self) -> NaiveDateTime {
        self.start
            .checked_add_signed(self.duration)
            .unwrap_or(NaiveDateTime::MAX)
    }
}

mod minutes {
    use chrono::Duration;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_minutes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let minutes = i64::deserialize(deserializer)?;
        Duration::try_minutes(minutes)
            .ok_or_else(|| D::Error::custom(format!("duration out of range: {minutes}m")))
    }
}

/// Parse a duration such as `90m`, `2h`, `1d` (bare numbers are minutes)
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return Err(Error::InvalidArgument("Duration cannot be empty".to_string()));
    }

    let (num_str, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, "m"),
    };

    let num: i64 = num_str
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("Invalid duration number: {}", num_str)))?;

    let duration = match unit.to_lowercase().as_str() {
        "m" | "min" | "minute" | "minutes" => Duration::try_minutes(num),
        "h" | "hr" | "hour" | "hours" => Duration::try_hours(num),
        "d" | "day" | "days" => Duration::try_days(num),
        "w" | "week" | "weeks" => Duration::try_weeks(num),
        _ => {
            return Err(Error::InvalidArgument(format!(
                "Invalid duration unit '{}'. Expected: m, h, d, w",
                unit
            )));
        }
    };

    duration.ok_or_else(|| Error::InvalidArgument(format!("Duration out of range: {}", s)))
}

/// Parse a local start time such as `2024-10-21T19:00`
pub fn parse_start(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    START_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "Invalid start time '{}'. Expected: YYYY-MM-DDTHH:MM[:SS]",
                s
            ))
        })
}

fn fmt_schedule(f: &mut fmt::Formatter<'_>, schedule: Option<&Schedule>) -> fmt::Result {
    match schedule {
        Some(schedule) => write!(
            f,
            ", start={}, duration={}m",
            schedule.start.format("%Y-%m-%dT%H:%M"),
            schedule.duration.num_minutes()
        ),
        None => Ok(()),
    }
}

fn fmt_id(id: Option<RecordId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string())
}

// =============================================================================
// Task
// =============================================================================

/// Standalone work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<RecordId>,
    pub name: String,
    pub description: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>, status: Status) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            status,
            schedule: None,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn scheduled(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task{{id={}, name='{}', description='{}', status={}",
            fmt_id(self.id),
            self.name,
            self.description,
            self.status
        )?;
        fmt_schedule(f, self.schedule.as_ref())?;
        write!(f, "}}")
    }
}

// =============================================================================
// Epic
// =============================================================================

/// Container of subtasks.
///
/// Status, start, end and duration are recomputed by the store from the
/// current subtasks; callers only control the name and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: Option<RecordId>,
    pub name: String,
    pub description: String,
    status: Status,
    subtask_ids: Vec<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDateTime>,
    #[serde(rename = "duration_minutes", with = "minutes")]
    duration: Duration,
}

impl Epic {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            status: Status::New,
            subtask_ids: Vec::new(),
            start: None,
            end: None,
            duration: Duration::zero(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn subtask_ids(&self) -> &[RecordId] {
        &self.subtask_ids
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The derived `[start, end)` window, if any subtask is scheduled
    pub fn window(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.start.zip(self.end)
    }

    /// Add a subtask id; already-present ids are left in place
    pub(crate) fn attach(&mut self, id: RecordId) {
        if !self.subtask_ids.contains(&id) {
            self.subtask_ids.push(id);
        }
    }

    pub(crate) fn detach(&mut self, id: RecordId) {
        self.subtask_ids.retain(|existing| *existing != id);
    }

    pub(crate) fn detach_all(&mut self) {
        self.subtask_ids.clear();
    }

    pub(crate) fn apply(&mut self, rollup: EpicRollup) {
        self.status = rollup.status;
        self.start = rollup.start;
        self.end = rollup.end;
        self.duration = rollup.duration;
    }

    /// Carry the stored subtask list and derived fields over a caller's edit
    pub(crate) fn take_derived_from(&mut self, previous: &Epic) {
        self.status = previous.status;
        self.subtask_ids = previous.subtask_ids.clone();
        self.start = previous.start;
        self.end = previous.end;
        self.duration = previous.duration;
    }

    pub(crate) fn reset_derived(&mut self) {
        self.status = Status::New;
        self.subtask_ids.clear();
        self.start = None;
        self.end = None;
        self.duration = Duration::zero();
    }
}

impl fmt::Display for Epic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.subtask_ids.iter().map(|id| id.to_string()).collect();
        write!(
            f,
            "Epic{{id={}, name='{}', description='{}', status={}, subtaskIds=[{}]",
            fmt_id(self.id),
            self.name,
            self.description,
            self.status,
            ids.join(", ")
        )?;
        if let Some((start, end)) = self.window() {
            write!(
                f,
                ", start={}, end={}",
                start.format("%Y-%m-%dT%H:%M"),
                end.format("%Y-%m-%dT%H:%M")
            )?;
        }
        write!(f, ", duration={}m}}", self.duration.num_minutes())
    }
}

// =============================================================================
// SubTask
// =============================================================================

/// Work item owned by exactly one epic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: Option<RecordId>,
    pub epic_id: RecordId,
    pub name: String,
    pub description: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

impl SubTask {
    pub fn new(
        epic_id: RecordId,
        name: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            id: None,
            epic_id,
            name: name.into(),
            description: description.into(),
            status,
            schedule: None,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn scheduled(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }
}

impl fmt::Display for SubTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubTask{{epicId={}, id={}, name='{}', description='{}', status={}",
            self.epic_id,
            fmt_id(self.id),
            self.name,
            self.description,
            self.status
        )?;
        fmt_schedule(f, self.schedule.as_ref())?;
        write!(f, "}}")
    }
}

// =============================================================================
// Record
// =============================================================================

/// Any stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Record {
    Task(Task),
    Epic(Epic),
    Subtask(SubTask),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Task(_) => RecordKind::Task,
            Record::Epic(_) => RecordKind::Epic,
            Record::Subtask(_) => RecordKind::Subtask,
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        match self {
            Record::Task(task) => task.id,
            Record::Epic(epic) => epic.id,
            Record::Subtask(subtask) => subtask.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Record::Task(task) => &task.name,
            Record::Epic(epic) => &epic.name,
            Record::Subtask(subtask) => &subtask.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Record::Task(task) => &task.description,
            Record::Epic(epic) => &epic.description,
            Record::Subtask(subtask) => &subtask.description,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Record::Task(task) => task.status,
            Record::Epic(epic) => epic.status(),
            Record::Subtask(subtask) => subtask.status,
        }
    }

    /// Owning epic, for subtasks
    pub fn epic_id(&self) -> Option<RecordId> {
        match self {
            Record::Subtask(subtask) => Some(subtask.epic_id),
            _ => None,
        }
    }

    /// Caller-supplied schedule; epics derive theirs and have none
    pub fn schedule(&self) -> Option<Schedule> {
        match self {
            Record::Task(task) => task.schedule,
            Record::Epic(_) => None,
            Record::Subtask(subtask) => subtask.schedule,
        }
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.interval().map(|(start, _)| start)
    }

    /// The `[start, end)` interval this record occupies, if scheduled
    pub fn interval(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match self {
            Record::Task(task) => task.schedule.map(|s| (s.start, s.end())),
            Record::Epic(epic) => epic.window(),
            Record::Subtask(subtask) => subtask.schedule.map(|s| (s.start, s.end())),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Task(task) => task.fmt(f),
            Record::Epic(epic) => epic.fmt(f),
            Record::Subtask(subtask) => subtask.fmt(f),
        }
    }
}

impl From<Task> for Record {
    fn from(task: Task) -> Self {
        Record::Task(task)
    }
}

impl From<Epic> for Record {
    fn from(epic: Epic) -> Self {
        Record::Epic(epic)
    }
}

impl From<SubTask> for Record {
    fn from(subtask: SubTask) -> Self {
        Record::Subtask(subtask)
    }
}
