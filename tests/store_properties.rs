mod support;

use chrono::Duration;
use taskdeck::history::{RecencyTracker, ViewHistory};
use taskdeck::record::{Epic, Record, RecordKind, Status, SubTask, Task};
use taskdeck::snapshot;
use taskdeck::store::RecordStore;
use taskdeck::Error;

use support::{at, slot};

fn epic_with_statuses(statuses: &[Status]) -> (RecordStore, u64) {
    let mut store = RecordStore::new();
    let epic = store.create_epic(Epic::new("Epic", "")).expect("epic");
    for (i, status) in statuses.iter().enumerate() {
        store
            .create_subtask(SubTask::new(epic, format!("sub {i}"), "", *status))
            .expect("no conflict")
            .expect("epic exists");
    }
    (store, epic)
}

fn epic_status(store: &RecordStore, epic: u64) -> Status {
    store
        .peek(RecordKind::Epic, epic)
        .map(|record| record.status())
        .expect("epic present")
}

#[test]
fn epic_status_rollup() {
    use Status::*;
    let cases: [(&[Status], Status); 6] = [
        (&[], New),
        (&[New, New], New),
        (&[Done, Done], Done),
        (&[New, Done], InProgress),
        (&[InProgress], InProgress),
        (&[Done, InProgress, New], InProgress),
    ];
    for (statuses, expected) in cases {
        let (store, epic) = epic_with_statuses(statuses);
        assert_eq!(epic_status(&store, epic), expected, "{statuses:?}");
    }
}

#[test]
fn epic_window_spans_scheduled_subtasks() {
    let mut store = RecordStore::new();
    let epic = store.create_epic(Epic::new("Trip", "")).expect("epic");
    store
        .create_subtask(SubTask::new(epic, "Fly", "", Status::New).scheduled(slot(14, 0, 120)))
        .expect("create");
    store
        .create_subtask(SubTask::new(epic, "Pack", "", Status::New).scheduled(slot(9, 0, 30)))
        .expect("create");
    store
        .create_subtask(SubTask::new(epic, "Someday", "", Status::New))
        .expect("create");

    let epic = store.get_epic(epic).expect("epic");
    assert_eq!(epic.start(), Some(at(9, 0)));
    assert_eq!(epic.end(), Some(at(16, 0)));
    assert_eq!(epic.duration(), Duration::minutes(150));
    assert_eq!(epic.subtask_ids().len(), 3);
}

#[test]
fn overlap_is_rejected_without_mutation() {
    let mut store = RecordStore::new();
    store
        .create_task(Task::new("Gym", "", Status::New).scheduled(slot(7, 0, 60)))
        .expect("first");

    let err = store
        .create_task(Task::new("Run", "", Status::New).scheduled(slot(7, 30, 30)))
        .expect_err("overlap");
    match err {
        Error::IntervalConflict { conflicting } => {
            assert_eq!(conflicting.name(), "Gym");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.len(), 1);
    assert_eq!(store.last_id(), 1);

    store
        .create_task(Task::new("Run", "", Status::New).scheduled(slot(8, 0, 30)))
        .expect("adjacent slot is free");
    store
        .create_task(Task::new("Stretch", "", Status::New).scheduled(slot(7, 15, 0)))
        .expect("empty slot never conflicts");
}

#[test]
fn subtask_may_sit_inside_its_epic_only() {
    let mut store = RecordStore::new();
    let epic = store.create_epic(Epic::new("Launch", "")).expect("epic");
    store
        .create_subtask(SubTask::new(epic, "Prep", "", Status::New).scheduled(slot(10, 0, 120)))
        .expect("first subtask");
    store
        .create_subtask(SubTask::new(epic, "Check", "", Status::New).scheduled(slot(12, 0, 30)))
        .expect("second subtask");

    let err = store
        .create_task(Task::new("Lunch", "", Status::New).scheduled(slot(11, 0, 30)))
        .expect_err("inside the epic window");
    assert!(matches!(err, Error::IntervalConflict { .. }));

    let err = store
        .create_subtask(SubTask::new(epic, "Clash", "", Status::New).scheduled(slot(10, 30, 15)))
        .expect_err("overlaps a sibling");
    assert!(matches!(err, Error::IntervalConflict { .. }));
}

#[test]
fn recency_moves_retouched_ids_to_the_end() {
    let mut tracker = RecencyTracker::new();
    for id in 1..=5 {
        tracker.touch(id);
    }
    assert_eq!(tracker.snapshot(), vec![1, 2, 3, 4, 5]);

    tracker.touch(2);
    assert_eq!(tracker.snapshot(), vec![1, 3, 4, 5, 2]);
    assert_eq!(tracker.len(), 5);
}

#[test]
fn removing_an_epic_removes_its_subtasks_everywhere() {
    let mut store = RecordStore::new();
    let epic = store.create_epic(Epic::new("Move", "")).expect("epic");
    let pack = store
        .create_subtask(SubTask::new(epic, "Pack", "", Status::New).scheduled(slot(8, 0, 60)))
        .expect("create")
        .expect("epic exists");
    let lift = store
        .create_subtask(SubTask::new(epic, "Lift", "", Status::New).scheduled(slot(9, 0, 60)))
        .expect("create")
        .expect("epic exists");
    let keep = store.create_task(Task::new("Keep", "", Status::New)).expect("task");

    for id in [epic, pack, lift, keep] {
        assert!(store.find(id).is_some());
    }

    store.remove(RecordKind::Epic, epic);

    for id in [epic, pack, lift] {
        assert!(store.find(id).is_none(), "id {id} still present");
    }
    assert!(store.get_epic(epic).is_none());
    assert!(store.get_subtask(pack).is_none());
    assert!(store.subtasks_of(epic).is_empty());
    assert_eq!(store.recency_snapshot(), vec![keep]);
    assert!(store.prioritized(true).is_empty());

    store
        .create_task(Task::new("Reuse", "", Status::New).scheduled(slot(8, 30, 60)))
        .expect("freed slot");
}

#[test]
fn snapshot_round_trip_keeps_every_record() {
    let mut store = RecordStore::new();
    store
        .create_task(Task::new("Breakfast", "Eggs", Status::Done).scheduled(slot(8, 0, 20)))
        .expect("task");
    let epic = store.create_epic(Epic::new("Cake", "Birthday")).expect("epic");
    store
        .create_subtask(
            SubTask::new(epic, "Bake", "Oven, 180", Status::InProgress).scheduled(slot(15, 0, 45)),
        )
        .expect("subtask");

    let restored = snapshot::decode(&snapshot::encode(&store)).expect("decode");

    assert!(restored.tasks().eq(store.tasks()));
    assert!(restored.epics().eq(store.epics()));
    assert!(restored.subtasks().eq(store.subtasks()));
    assert_eq!(restored.prioritized(true), store.prioritized(true));
}

#[test]
fn prioritized_directions_mirror_each_other() {
    let mut store = RecordStore::new();
    for hour in [13, 9, 17, 11] {
        store
            .create_task(Task::new(format!("at {hour}"), "", Status::New).scheduled(slot(hour, 0, 60)))
            .expect("task");
    }
    store
        .create_task(Task::new("unscheduled", "", Status::New))
        .expect("task");

    let ascending = store.prioritized(true);
    let mut descending = store.prioritized(false);
    assert_eq!(ascending.len(), 4);
    assert_eq!(descending.len(), 4);

    let starts: Vec<_> = ascending.iter().filter_map(Record::start).collect();
    assert_eq!(starts, vec![at(9, 0), at(11, 0), at(13, 0), at(17, 0)]);

    descending.reverse();
    assert_eq!(ascending, descending);
}

#[test]
fn restored_ids_push_the_counter_forward() {
    let mut store = RecordStore::new();
    store
        .create(Task::new("Imported", "", Status::New).with_id(10))
        .expect("create")
        .expect("id");
    let next = store.create_task(Task::new("Next", "", Status::New)).expect("task");
    assert_eq!(next, 11);

    let err = store
        .create(Epic::new("Clash", "").with_id(10))
        .expect_err("duplicate");
    assert!(matches!(err, Error::DuplicateId(10)));

    store.clear_all();
    let fresh = store.create_task(Task::new("Fresh", "", Status::New)).expect("task");
    assert_eq!(fresh, 1);
}
