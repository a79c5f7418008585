//! Flat text snapshot of a record store
//!
//! ```text
//! id,type,name,status,description,epic,start,duration
//! 1,TASK,Breakfast,NEW,Eggs and toast,,2024-10-21T08:00:00,30
//! 2,EPIC,Cake,IN_PROGRESS,Layered,,,
//! 3,SUBTASK,Recipe,DONE,Find one,2,,
//! ```
//!
//! Rows are written tasks first, then epics, then subtasks, so a decoder can
//! replay them in file order. Fields containing a comma, quote or line break
//! are wrapped in double quotes with inner quotes doubled. `start` and
//! `duration` (whole minutes) are empty for unscheduled records and for epics,
//! whose status and window are recomputed on load.
//!
//! Snapshots written without the two schedule columns ([`LEGACY_HEADER`]) are
//! still accepted; every record in them loads unscheduled.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;
use tracing::info;

use crate::error::Error;
use crate::history::{RecencyTracker, ViewHistory};
use crate::record::{Epic, Record, RecordId, RecordKind, Schedule, Status, SubTask, Task};
use crate::store::RecordStore;

/// Header row written by [`encode`]
pub const HEADER: &str = "id,type,name,status,description,epic,start,duration";

/// Header of snapshots that predate the schedule columns
pub const LEGACY_HEADER: &str = "id,type,name,status,description,epic";

const START_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Failure to read a snapshot. Any error aborts the whole load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot is empty")]
    Empty,

    #[error("unexpected header '{found}', expected '{}'", HEADER)]
    Header { found: String },

    #[error("line {line}: {reason}")]
    Row { line: usize, reason: String },
}

/// Encode every record, header first
pub fn encode<H: ViewHistory>(store: &RecordStore<H>) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for record in store.records() {
        out.push_str(&encode_record(&record));
        out.push('\n');
    }
    out
}

pub fn encode_record(record: &Record) -> String {
    let id = record.id().map(|id| id.to_string()).unwrap_or_default();
    let epic = record
        .epic_id()
        .map(|id| id.to_string())
        .unwrap_or_default();
    let (start, duration) = match record.schedule() {
        Some(schedule) => (
            schedule.start.format(START_FORMAT).to_string(),
            schedule.duration().num_minutes().to_string(),
        ),
        None => (String::new(), String::new()),
    };
    [
        id,
        record.kind().to_string(),
        encode_field(record.name()),
        record.status().to_string(),
        encode_field(record.description()),
        epic,
        start,
        duration,
    ]
    .join(",")
}

fn encode_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Decode into a store with an unbounded view history
pub fn decode(input: &str) -> Result<RecordStore, SnapshotError> {
    decode_with(input, RecencyTracker::new())
}

/// Decode into a store using the given view history.
///
/// Ids are restored as written, so ids assigned afterwards continue past the
/// highest restored id.
pub fn decode_with<H: ViewHistory>(
    input: &str,
    history: H,
) -> Result<RecordStore<H>, SnapshotError> {
    if input.trim().is_empty() {
        return Err(SnapshotError::Empty);
    }

    let mut rows = split_rows(input)?.into_iter();
    let header = rows.next().map(|(_, fields)| fields.join(",")).unwrap_or_default();
    let with_schedule = match header.as_str() {
        HEADER => true,
        LEGACY_HEADER => false,
        _ => return Err(SnapshotError::Header { found: header }),
    };

    let mut store = RecordStore::with_history(history);
    for (line, fields) in rows {
        let record = parse_row(&fields, with_schedule)
            .map_err(|reason| SnapshotError::Row { line, reason })?;
        restore(&mut store, record).map_err(|reason| SnapshotError::Row { line, reason })?;
    }

    info!(records = store.len(), "decoded snapshot");
    Ok(store)
}

fn restore<H: ViewHistory>(store: &mut RecordStore<H>, record: Record) -> Result<(), String> {
    let epic_id = record.epic_id();
    match store.create(record) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(format!(
            "epic {} not found",
            epic_id.map(|id| id.to_string()).unwrap_or_default()
        )),
        Err(Error::DuplicateId(id)) => Err(format!("duplicate id {id}")),
        Err(err) => Err(err.to_string()),
    }
}

fn parse_row(fields: &[String], with_schedule: bool) -> Result<Record, String> {
    let expected = if with_schedule { 8 } else { 6 };
    if fields.len() != expected {
        return Err(format!(
            "expected {expected} fields, found {}",
            fields.len()
        ));
    }

    let id = parse_id(&fields[0], "id")?;
    let kind: RecordKind = fields[1]
        .parse()
        .map_err(|_| format!("unknown record type '{}'", fields[1]))?;
    let name = fields[2].clone();
    let status: Status = fields[3]
        .parse()
        .map_err(|_| format!("unknown status '{}'", fields[3]))?;
    let description = fields[4].clone();
    let schedule = if with_schedule {
        parse_schedule(&fields[6], &fields[7])?
    } else {
        None
    };

    let record = match kind {
        RecordKind::Task => {
            let mut task = Task::new(name, description, status).with_id(id);
            task.schedule = schedule;
            task.into()
        }
        RecordKind::Epic => {
            if schedule.is_some() {
                return Err("epics cannot carry a schedule".to_string());
            }
            Epic::new(name, description).with_id(id).into()
        }
        RecordKind::Subtask => {
            let epic_id = parse_id(&fields[5], "epic")?;
            let mut subtask = SubTask::new(epic_id, name, description, status).with_id(id);
            subtask.schedule = schedule;
            subtask.into()
        }
    };
    Ok(record)
}

fn parse_id(value: &str, column: &str) -> Result<RecordId, String> {
    match value.trim().parse::<RecordId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("invalid {column} '{value}'")),
    }
}

fn parse_schedule(start: &str, duration: &str) -> Result<Option<Schedule>, String> {
    let (start, duration) = (start.trim(), duration.trim());
    match (start.is_empty(), duration.is_empty()) {
        (true, true) => return Ok(None),
        (false, false) => {}
        _ => return Err("start and duration must both be set or both be empty".to_string()),
    }

    let start = NaiveDateTime::parse_from_str(start, START_FORMAT)
        .map_err(|_| format!("invalid start '{start}'"))?;
    let minutes: i64 = duration
        .parse()
        .map_err(|_| format!("invalid duration '{duration}'"))?;
    let duration =
        Duration::try_minutes(minutes).ok_or_else(|| format!("duration out of range '{minutes}'"))?;
    Schedule::new(start, duration)
        .map(Some)
        .map_err(|err| err.to_string())
}

/// Split input into rows of fields, tagged with the line each row starts on.
/// Blank lines are skipped.
fn split_rows(input: &str) -> Result<Vec<(usize, Vec<String>)>, SnapshotError> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut at_field_start = true;
    let mut line = 1;
    let mut row_line = 1;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quoted = false,
                _ => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
            }
            continue;
        }

        match c {
            ',' => {
                fields.push(std::mem::take(&mut field));
                at_field_start = true;
                continue;
            }
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_row(&mut rows, row_line, std::mem::take(&mut fields));
                line += 1;
                row_line = line;
                at_field_start = true;
                continue;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '"' if at_field_start => quoted = true,
            _ => field.push(c),
        }
        at_field_start = false;
    }

    if quoted {
        return Err(SnapshotError::Row {
            line: row_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_row(&mut rows, row_line, fields);
    }
    Ok(rows)
}

fn push_row(rows: &mut Vec<(usize, Vec<String>)>, line: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        rows.push((line, fields));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 10, 21)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid time")
    }

    fn sample_store() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .create_task(
                Task::new("Breakfast", "Eggs, toast", Status::New)
                    .scheduled(Schedule::new(at(8), Duration::minutes(30)).expect("schedule")),
            )
            .expect("task");
        let epic = store
            .create_epic(Epic::new("Cake", "Say \"layered\""))
            .expect("epic");
        store
            .create_subtask(SubTask::new(epic, "Recipe", "Find one", Status::Done))
            .expect("subtask");
        store
    }

    #[test]
    fn encode_writes_header_and_rows() {
        let text = encode(&sample_store());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                HEADER,
                "1,TASK,Breakfast,NEW,\"Eggs, toast\",,2024-10-21T08:00:00,30",
                "2,EPIC,Cake,DONE,\"Say \"\"layered\"\"\",,,",
                "3,SUBTASK,Recipe,DONE,Find one,2,,",
            ]
        );
    }

    #[test]
    fn decode_restores_records_and_ids() {
        let store = sample_store();
        let restored = decode(&encode(&store)).expect("decode");
        assert_eq!(restored.records(), store.records());
        assert_eq!(restored.last_id(), 3);
    }

    #[test]
    fn decode_accepts_crlf_and_blank_lines() {
        let text = format!("{HEADER}\r\n1,TASK,A,NEW,desc,,,\r\n\r\n2,EPIC,B,NEW,,,,\r\n");
        let store = decode(&text).expect("decode");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn header_only_is_an_empty_store() {
        let store = decode(&format!("{HEADER}\n")).expect("decode");
        assert!(store.is_empty());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(decode("").expect_err("empty"), SnapshotError::Empty);
        assert_eq!(decode(" \n").expect_err("blank"), SnapshotError::Empty);
    }

    #[test]
    fn wrong_header_is_rejected() {
        let err = decode(&format!("{HEADER},extra\n1,TASK,A,NEW,d,,,,\n")).expect_err("header");
        assert!(matches!(err, SnapshotError::Header { .. }));
    }

    #[test]
    fn bad_rows_report_their_line() {
        let cases = [
            "1,STORY,A,NEW,d,,,",
            "x,TASK,A,NEW,d,,,",
            "1,TASK,A,CLOSED,d,,,",
            "1,TASK,A,NEW",
            "1,SUBTASK,A,NEW,d,,,",
            "1,SUBTASK,A,NEW,d,9,,",
            "1,TASK,A,NEW,d,,2024-10-21T08:00:00,",
            "1,TASK,A,NEW,d,,yesterday,30",
            "1,TASK,A,NEW,d,,2024-10-21T08:00:00,-5",
            "1,EPIC,A,NEW,d,,2024-10-21T08:00:00,30",
            "1,TASK,A,NEW,d,,2024-10-21T08:00:00,9223372036854775807",
            "1,TASK,A,NEW,d,,2024-10-21T08:00:00,200000000000",
        ];
        for row in cases {
            let text = format!("{HEADER}\n{row}\n");
            let err = decode(&text).expect_err(row);
            assert!(
                matches!(err, SnapshotError::Row { line: 2, .. }),
                "{row}: {err:?}"
            );
        }
    }

    #[test]
    fn duplicate_ids_abort_the_load() {
        let text = format!("{HEADER}\n1,TASK,A,NEW,d,,,\n1,EPIC,B,NEW,d,,,\n");
        let err = decode(&text).expect_err("duplicate");
        assert_eq!(
            err,
            SnapshotError::Row {
                line: 3,
                reason: "duplicate id 1".to_string()
            }
        );
    }

    #[test]
    fn quoted_fields_may_span_lines() {
        let text = format!("{HEADER}\n1,TASK,A,NEW,\"two\nlines\",,,\n2,TASK,B,NEW,d,,,\n");
        let mut store = decode(&text).expect("decode");
        let task = store.get_task(1).expect("task");
        assert_eq!(task.description, "two\nlines");
        assert!(store.get_task(2).is_some());
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let text = format!("{HEADER}\n1,TASK,\"A,NEW,d,,,\n");
        assert!(matches!(
            decode(&text).expect_err("quote"),
            SnapshotError::Row { line: 2, .. }
        ));
    }

    #[test]
    fn decode_restores_schedules_and_epic_windows() {
        let text = format!(
            "{HEADER}\n2,EPIC,Cake,NEW,,,,\n3,SUBTASK,Bake,IN_PROGRESS,,2,2024-10-21T10:00:00,90\n"
        );
        let store = decode(&text).expect("decode");
        let epic = store.peek(RecordKind::Epic, 2).expect("epic");
        assert_eq!(epic.status(), Status::InProgress);
        assert_eq!(
            epic.interval(),
            Some((at(10), at(11) + Duration::minutes(30)))
        );
        assert_eq!(store.prioritized(true).len(), 2);
    }

    #[test]
    fn overlapping_rows_abort_the_load() {
        let text = format!(
            "{HEADER}\n1,TASK,A,NEW,,,2024-10-21T08:00:00,60\n2,TASK,B,NEW,,,2024-10-21T08:30:00,60\n"
        );
        assert!(matches!(
            decode(&text).expect_err("overlap"),
            SnapshotError::Row { line: 3, .. }
        ));
    }

    #[test]
    fn legacy_header_loads_unscheduled_records() {
        let text = format!("{LEGACY_HEADER}\n1,TASK,A,NEW,d,\n2,EPIC,B,NEW,,\n3,SUBTASK,C,DONE,,2\n");
        let store = decode(&text).expect("decode");
        assert_eq!(store.len(), 3);
        assert!(store.prioritized(true).is_empty());
        assert_eq!(
            store.peek(RecordKind::Epic, 2).map(|epic| epic.status()),
            Some(Status::Done)
        );
    }

    #[test]
    fn legacy_rows_need_six_fields() {
        let text = format!("{LEGACY_HEADER}\n1,TASK,A,NEW,d,,,\n");
        assert!(matches!(
            decode(&text).expect_err("fields"),
            SnapshotError::Row { line: 2, .. }
        ));
    }
}
