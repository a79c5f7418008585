mod support;

use std::fs;

use taskdeck::history::{RecencyTracker, ViewHistory};
use taskdeck::record::{Epic, RecordKind, Status, SubTask, Task};
use taskdeck::snapshot::{SnapshotError, HEADER, LEGACY_HEADER};
use taskdeck::storage::FileStore;
use taskdeck::Error;

use support::{slot, TestDeck};

#[test]
fn reopened_store_matches_saved_one() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    let path = deck.snapshot_path();

    let mut store = FileStore::create(&path, RecencyTracker::new());
    store.create_task(Task::new("Write", "Chapter \"one\"", Status::InProgress).scheduled(slot(9, 0, 90)))?;
    let epic = store.create_epic(Epic::new("Garden", "Spring"))?;
    store.create_subtask(SubTask::new(epic, "Dig", "Beds", Status::Done).scheduled(slot(13, 0, 60)))?;
    store.create_subtask(SubTask::new(epic, "Plant", "Seeds\nand bulbs", Status::New))?;

    let reopened = FileStore::open(&path, RecencyTracker::new())?;
    assert_eq!(reopened.store().records(), store.store().records());
    assert_eq!(reopened.store().last_id(), 4);
    assert_eq!(
        reopened
            .store()
            .peek(RecordKind::Epic, epic)
            .map(|record| record.status()),
        Some(Status::InProgress)
    );

    Ok(())
}

#[test]
fn ids_continue_after_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    deck.write_file(
        "tasks.csv",
        &format!("{HEADER}\n7,TASK,Old,DONE,,,,\n"),
    )?;

    let mut store = FileStore::open(deck.snapshot_path(), RecencyTracker::new())?;
    let id = store.create_task(Task::new("New", "", Status::New))?;
    assert_eq!(id, 8);

    Ok(())
}

#[test]
fn legacy_snapshot_is_upgraded_on_save() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    deck.write_file(
        "tasks.csv",
        &format!("{LEGACY_HEADER}\n1,TASK,A,NEW,d,\n2,EPIC,B,NEW,,\n3,SUBTASK,C,DONE,,2\n"),
    )?;

    let mut store = FileStore::open(deck.snapshot_path(), RecencyTracker::new())?;
    assert!(store.update(Task::new("A", "changed", Status::Done).with_id(1))?);

    let written = deck.read_snapshot()?;
    assert_eq!(
        written,
        format!("{HEADER}\n1,TASK,A,DONE,changed,,,\n2,EPIC,B,DONE,,,,\n3,SUBTASK,C,DONE,,2,,\n")
    );

    Ok(())
}

#[test]
fn failed_load_reports_row() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    deck.write_file(
        "tasks.csv",
        &format!("{HEADER}\n1,TASK,A,NEW,,,,\n2,SUBTASK,B,NEW,,9,,\n"),
    )?;

    let err = FileStore::open(deck.snapshot_path(), RecencyTracker::new())
        .expect_err("missing epic");
    match err {
        Error::Snapshot(SnapshotError::Row { line, reason }) => {
            assert_eq!(line, 3);
            assert_eq!(reason, "epic 9 not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[test]
fn conflicting_update_leaves_file_alone() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    let path = deck.snapshot_path();

    let mut store = FileStore::create(&path, RecencyTracker::new());
    store.create_task(Task::new("A", "", Status::New).scheduled(slot(9, 0, 60)))?;
    let b = store.create_task(Task::new("B", "", Status::New).scheduled(slot(11, 0, 60)))?;
    let before = fs::read_to_string(&path)?;

    let err = store
        .update(Task::new("B", "", Status::New).with_id(b).scheduled(slot(9, 30, 60)))
        .expect_err("overlap");
    assert!(matches!(err, Error::IntervalConflict { .. }));
    assert_eq!(fs::read_to_string(&path)?, before);

    assert!(!store.update(Task::new("Ghost", "", Status::New).with_id(99))?);
    assert_eq!(fs::read_to_string(&path)?, before);

    Ok(())
}

#[test]
fn views_are_not_persisted() -> Result<(), Box<dyn std::error::Error>> {
    let deck = TestDeck::new();
    let path = deck.snapshot_path();

    let mut store = FileStore::create(&path, RecencyTracker::new());
    let id = store.create_task(Task::new("A", "", Status::New))?;
    assert!(store.get(RecordKind::Task, id).is_some());
    assert_eq!(store.store().history_tracker().snapshot(), vec![id]);

    let reopened = FileStore::open(&path, RecencyTracker::new())?;
    assert!(reopened.store().history_tracker().is_empty());

    Ok(())
}
