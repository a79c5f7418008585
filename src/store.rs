//! Record store: tasks, epics and subtasks in memory
//!
//! Every mutation goes through [`RecordStore`]. Scheduled records are checked
//! against the [`IntervalIndex`] before anything is committed, subtask changes
//! roll up into their epic, and successful reads are reported to the
//! [`ViewHistory`].

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::aggregate;
use crate::error::{Error, Result};
use crate::history::{RecencyTracker, ViewHistory};
use crate::interval::{IntervalIndex, Slot};
use crate::record::{Epic, Record, RecordId, RecordKind, SubTask, Task};

#[derive(Debug, Clone)]
pub struct RecordStore<H = RecencyTracker> {
    last_id: RecordId,
    tasks: BTreeMap<RecordId, Task>,
    epics: BTreeMap<RecordId, Epic>,
    subtasks: BTreeMap<RecordId, SubTask>,
    intervals: IntervalIndex,
    history: H,
}

impl RecordStore<RecencyTracker> {
    /// Store with an unbounded recency tracker
    pub fn new() -> Self {
        Self::with_history(RecencyTracker::new())
    }
}

impl Default for RecordStore<RecencyTracker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ViewHistory> RecordStore<H> {
    pub fn with_history(history: H) -> Self {
        Self {
            last_id: 0,
            tasks: BTreeMap::new(),
            epics: BTreeMap::new(),
            subtasks: BTreeMap::new(),
            intervals: IntervalIndex::new(),
            history,
        }
    }

    pub fn history_tracker(&self) -> &H {
        &self.history
    }

    /// Highest id handed out or restored so far
    pub fn last_id(&self) -> RecordId {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len() + self.epics.len() + self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.kind_of(id).is_some()
    }

    pub fn kind_of(&self, id: RecordId) -> Option<RecordKind> {
        if self.tasks.contains_key(&id) {
            Some(RecordKind::Task)
        } else if self.epics.contains_key(&id) {
            Some(RecordKind::Epic)
        } else if self.subtasks.contains_key(&id) {
            Some(RecordKind::Subtask)
        } else {
            None
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Insert a record of any kind.
    ///
    /// Returns `Ok(None)` for a subtask whose epic is not in the store.
    pub fn create(&mut self, record: impl Into<Record>) -> Result<Option<RecordId>> {
        match record.into() {
            Record::Task(task) => self.create_task(task).map(Some),
            Record::Epic(epic) => self.create_epic(epic).map(Some),
            Record::Subtask(subtask) => self.create_subtask(subtask),
        }
    }

    pub fn create_task(&mut self, mut task: Task) -> Result<RecordId> {
        let id = self.resolve_id(task.id)?;
        if let Some(schedule) = task.schedule {
            self.check_slot(schedule.start, schedule.end(), &[id])?;
        }

        task.id = Some(id);
        self.commit_id(id);
        self.reindex(id, task.schedule.map(|s| (s.start, s.end())));
        self.tasks.insert(id, task);
        debug!(id, kind = %RecordKind::Task, "created record");
        Ok(id)
    }

    /// Insert an epic. Status and window start out derived from no subtasks.
    pub fn create_epic(&mut self, mut epic: Epic) -> Result<RecordId> {
        let id = self.resolve_id(epic.id)?;

        epic.id = Some(id);
        epic.reset_derived();
        self.commit_id(id);
        self.epics.insert(id, epic);
        debug!(id, kind = %RecordKind::Epic, "created record");
        Ok(id)
    }

    pub fn create_subtask(&mut self, mut subtask: SubTask) -> Result<Option<RecordId>> {
        let epic_id = subtask.epic_id;
        if !self.epics.contains_key(&epic_id) {
            warn!(epic_id, "subtask rejected: epic not found");
            return Ok(None);
        }

        let id = self.resolve_id(subtask.id)?;
        subtask.id = Some(id);
        self.check_subtask_slot(&subtask, id, None)?;

        self.commit_id(id);
        self.reindex(id, subtask.schedule.map(|s| (s.start, s.end())));
        self.subtasks.insert(id, subtask);
        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.attach(id);
        }
        self.refresh_epic(epic_id);
        debug!(id, epic_id, kind = %RecordKind::Subtask, "created record");
        Ok(Some(id))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replace a stored record's mutable fields.
    ///
    /// Returns `Ok(false)` when the record has no id, the id is not stored
    /// under that kind, or a subtask names an epic that is not in the store.
    pub fn update(&mut self, record: impl Into<Record>) -> Result<bool> {
        match record.into() {
            Record::Task(task) => self.update_task(task),
            Record::Epic(epic) => self.update_epic(epic),
            Record::Subtask(subtask) => self.update_subtask(subtask),
        }
    }

    pub fn update_task(&mut self, task: Task) -> Result<bool> {
        let Some(id) = task.id else {
            return Ok(false);
        };
        if !self.tasks.contains_key(&id) {
            return Ok(false);
        }
        if let Some(schedule) = task.schedule {
            self.check_slot(schedule.start, schedule.end(), &[id])?;
        }

        self.reindex(id, task.schedule.map(|s| (s.start, s.end())));
        self.tasks.insert(id, task);
        debug!(id, kind = %RecordKind::Task, "updated record");
        Ok(true)
    }

    /// Rename or re-describe an epic. Its subtasks and derived fields stay.
    pub fn update_epic(&mut self, mut epic: Epic) -> Result<bool> {
        let Some(id) = epic.id else {
            return Ok(false);
        };
        let Some(stored) = self.epics.get_mut(&id) else {
            return Ok(false);
        };

        epic.take_derived_from(stored);
        *stored = epic;
        debug!(id, kind = %RecordKind::Epic, "updated record");
        Ok(true)
    }

    /// Replace a subtask; changing `epic_id` moves it between epics.
    pub fn update_subtask(&mut self, subtask: SubTask) -> Result<bool> {
        let Some(id) = subtask.id else {
            return Ok(false);
        };
        let Some(previous_epic) = self.subtasks.get(&id).map(|stored| stored.epic_id) else {
            return Ok(false);
        };
        let epic_id = subtask.epic_id;
        if !self.epics.contains_key(&epic_id) {
            warn!(id, epic_id, "subtask update rejected: epic not found");
            return Ok(false);
        }
        self.check_subtask_slot(&subtask, id, Some(previous_epic))?;

        self.reindex(id, subtask.schedule.map(|s| (s.start, s.end())));
        self.subtasks.insert(id, subtask);
        if previous_epic != epic_id {
            if let Some(old) = self.epics.get_mut(&previous_epic) {
                old.detach(id);
            }
            self.refresh_epic(previous_epic);
        }
        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.attach(id);
        }
        self.refresh_epic(epic_id);
        debug!(id, epic_id, kind = %RecordKind::Subtask, "updated record");
        Ok(true)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Fetch a record and mark it as viewed
    pub fn get(&mut self, kind: RecordKind, id: RecordId) -> Option<Record> {
        let record = self.peek(kind, id)?;
        self.history.touch(id);
        Some(record)
    }

    /// Fetch a record of any kind and mark it as viewed
    pub fn find(&mut self, id: RecordId) -> Option<Record> {
        let kind = self.kind_of(id)?;
        self.get(kind, id)
    }

    pub fn get_task(&mut self, id: RecordId) -> Option<&Task> {
        if self.tasks.contains_key(&id) {
            self.history.touch(id);
        }
        self.tasks.get(&id)
    }

    pub fn get_epic(&mut self, id: RecordId) -> Option<&Epic> {
        if self.epics.contains_key(&id) {
            self.history.touch(id);
        }
        self.epics.get(&id)
    }

    pub fn get_subtask(&mut self, id: RecordId) -> Option<&SubTask> {
        if self.subtasks.contains_key(&id) {
            self.history.touch(id);
        }
        self.subtasks.get(&id)
    }

    /// Look a record up without touching the view history
    pub fn peek(&self, kind: RecordKind, id: RecordId) -> Option<Record> {
        match kind {
            RecordKind::Task => self.tasks.get(&id).cloned().map(Record::Task),
            RecordKind::Epic => self.epics.get(&id).cloned().map(Record::Epic),
            RecordKind::Subtask => self.subtasks.get(&id).cloned().map(Record::Subtask),
        }
    }

    fn peek_any(&self, id: RecordId) -> Option<Record> {
        self.kind_of(id).and_then(|kind| self.peek(kind, id))
    }

    /// Subtasks of an epic in the epic's own order; empty for unknown epics
    pub fn subtasks_of(&self, epic_id: RecordId) -> Vec<&SubTask> {
        self.epics
            .get(&epic_id)
            .map(|epic| {
                epic.subtask_ids()
                    .iter()
                    .filter_map(|id| self.subtasks.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn epics(&self) -> impl Iterator<Item = &Epic> {
        self.epics.values()
    }

    pub fn subtasks(&self) -> impl Iterator<Item = &SubTask> {
        self.subtasks.values()
    }

    /// Every record: tasks, then epics, then subtasks, each by ascending id
    pub fn records(&self) -> Vec<Record> {
        self.tasks
            .values()
            .cloned()
            .map(Record::Task)
            .chain(self.epics.values().cloned().map(Record::Epic))
            .chain(self.subtasks.values().cloned().map(Record::Subtask))
            .collect()
    }

    /// Scheduled records by start time (ties by id); descending when
    /// `ascending` is false
    pub fn prioritized(&self, ascending: bool) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .intervals
            .iter()
            .filter_map(|slot| self.peek_any(slot.id))
            .collect();
        if !ascending {
            records.reverse();
        }
        records
    }

    /// Viewed ids, oldest first
    pub fn recency_snapshot(&self) -> Vec<RecordId> {
        self.history.snapshot()
    }

    /// Viewed records, oldest first
    pub fn history(&self) -> Vec<Record> {
        self.history
            .snapshot()
            .into_iter()
            .filter_map(|id| self.peek_any(id))
            .collect()
    }

    /// One kind-tagged line per record, for diagnostics
    pub fn dump(&self) -> Vec<String> {
        self.records().iter().map(ToString::to_string).collect()
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Remove a record; removing an epic removes its subtasks too.
    /// Unknown ids are ignored.
    pub fn remove(&mut self, kind: RecordKind, id: RecordId) {
        match kind {
            RecordKind::Task => {
                if self.tasks.remove(&id).is_some() {
                    self.forget(id);
                    debug!(id, kind = %kind, "removed record");
                }
            }
            RecordKind::Epic => {
                if let Some(epic) = self.epics.remove(&id) {
                    for &subtask_id in epic.subtask_ids() {
                        self.subtasks.remove(&subtask_id);
                        self.forget(subtask_id);
                    }
                    self.forget(id);
                    debug!(
                        id,
                        kind = %kind,
                        subtasks = epic.subtask_ids().len(),
                        "removed record"
                    );
                }
            }
            RecordKind::Subtask => {
                if let Some(subtask) = self.subtasks.remove(&id) {
                    self.forget(id);
                    if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
                        epic.detach(id);
                    }
                    self.refresh_epic(subtask.epic_id);
                    debug!(id, kind = %kind, "removed record");
                }
            }
        }
    }

    /// Remove whatever record holds `id`; returns its kind if one did
    pub fn remove_id(&mut self, id: RecordId) -> Option<RecordKind> {
        let kind = self.kind_of(id)?;
        self.remove(kind, id);
        Some(kind)
    }

    /// Remove every record of a kind.
    ///
    /// Clearing epics clears all subtasks. Clearing subtasks empties every
    /// epic's subtask list and recomputes it.
    pub fn clear_kind(&mut self, kind: RecordKind) {
        match kind {
            RecordKind::Task => {
                let ids: Vec<RecordId> = self.tasks.keys().copied().collect();
                ids.into_iter().for_each(|id| self.forget(id));
                self.tasks.clear();
            }
            RecordKind::Epic => {
                let ids: Vec<RecordId> = self
                    .epics
                    .keys()
                    .chain(self.subtasks.keys())
                    .copied()
                    .collect();
                ids.into_iter().for_each(|id| self.forget(id));
                self.epics.clear();
                self.subtasks.clear();
            }
            RecordKind::Subtask => {
                let ids: Vec<RecordId> = self.subtasks.keys().copied().collect();
                ids.into_iter().for_each(|id| self.forget(id));
                self.subtasks.clear();
                let epic_ids: Vec<RecordId> = self.epics.keys().copied().collect();
                for epic_id in epic_ids {
                    if let Some(epic) = self.epics.get_mut(&epic_id) {
                        epic.detach_all();
                    }
                    self.refresh_epic(epic_id);
                }
            }
        }
        debug!(kind = %kind, "cleared records");
    }

    /// Remove everything and restart id assignment
    pub fn clear_all(&mut self) {
        self.tasks.clear();
        self.epics.clear();
        self.subtasks.clear();
        self.intervals.clear();
        self.history.clear();
        self.last_id = 0;
        debug!("cleared all records");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Pick the id a new record will get, without consuming it
    fn resolve_id(&self, requested: Option<RecordId>) -> Result<RecordId> {
        match requested {
            Some(0) => Err(Error::InvalidArgument(
                "record id must be positive".to_string(),
            )),
            Some(id) if self.contains(id) => Err(Error::DuplicateId(id)),
            Some(id) => Ok(id),
            None => self.last_id.checked_add(1).ok_or_else(|| {
                Error::InvalidArgument("record id space exhausted".to_string())
            }),
        }
    }

    fn commit_id(&mut self, id: RecordId) {
        self.last_id = self.last_id.max(id);
    }

    fn reindex(&mut self, id: RecordId, interval: Option<(NaiveDateTime, NaiveDateTime)>) {
        match interval {
            Some((start, end)) => self.intervals.insert(id, start, end),
            None => {
                self.intervals.remove(id);
            }
        }
    }

    fn forget(&mut self, id: RecordId) {
        self.intervals.remove(id);
        self.history.remove(id);
    }

    fn check_slot(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: &[RecordId],
    ) -> Result<()> {
        let conflicting = self
            .intervals
            .conflicts_with(start, end, exclude)
            .and_then(|slot| self.peek_any(slot.id));
        match conflicting {
            Some(conflicting) => {
                warn!(
                    conflicting_id = conflicting.id(),
                    %start,
                    %end,
                    "time slot already taken"
                );
                Err(Error::IntervalConflict {
                    conflicting: Box::new(conflicting),
                })
            }
            None => Ok(()),
        }
    }

    /// Check a subtask's own slot, then the window its epic would grow to.
    ///
    /// The subtask's own epic never conflicts with it; the epic's grown window
    /// must stay clear of records outside the epic. A subtask moving away is
    /// checked against what its previous epic's window shrinks to.
    fn check_subtask_slot(
        &self,
        subtask: &SubTask,
        id: RecordId,
        previous_epic: Option<RecordId>,
    ) -> Result<()> {
        let epic_id = subtask.epic_id;
        if let Some(schedule) = subtask.schedule {
            let mut exclude = vec![id, epic_id];
            exclude.extend(previous_epic);
            self.check_slot(schedule.start, schedule.end(), &exclude)?;
        }

        let Some(epic) = self.epics.get(&epic_id) else {
            return Ok(());
        };
        let siblings = epic
            .subtask_ids()
            .iter()
            .filter(|&&sibling| sibling != id)
            .filter_map(|sibling| self.subtasks.get(sibling));
        let rollup = aggregate::rollup(siblings.chain(std::iter::once(subtask)));
        let window = rollup.start.zip(rollup.end);
        if let Some((start, end)) = window {
            let mut exclude: Vec<RecordId> = epic.subtask_ids().to_vec();
            exclude.extend([epic_id, id]);
            exclude.extend(previous_epic);
            self.check_slot(start, end, &exclude)?;
        }

        match (previous_epic, window) {
            (Some(previous), Some((start, end))) if previous != epic_id => {
                self.check_left_behind(previous, id, start, end)
            }
            _ => Ok(()),
        }
    }

    /// `[start, end)` must stay clear of `previous`'s window once `id` leaves it.
    ///
    /// The indexed window of `previous` still covers the departing subtask, so
    /// the index cannot answer this.
    fn check_left_behind(
        &self,
        previous: RecordId,
        id: RecordId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<()> {
        let Some(epic) = self.epics.get(&previous) else {
            return Ok(());
        };
        let remaining = aggregate::rollup(
            epic.subtask_ids()
                .iter()
                .filter(|&&sibling| sibling != id)
                .filter_map(|sibling| self.subtasks.get(sibling)),
        );
        let Some((left_start, left_end)) = remaining.start.zip(remaining.end) else {
            return Ok(());
        };
        let left_behind = Slot {
            id: previous,
            start: left_start,
            end: left_end,
        };
        if start >= end || !left_behind.overlaps(start, end) {
            return Ok(());
        }
        warn!(
            conflicting_id = previous,
            %start,
            %end,
            "moved subtask would land inside its previous epic"
        );
        Err(Error::IntervalConflict {
            conflicting: Box::new(Record::from(epic.clone())),
        })
    }

    /// Recompute an epic from its current subtasks; no-op for epics no
    /// longer in the store
    fn refresh_epic(&mut self, epic_id: RecordId) {
        let Some(epic) = self.epics.get(&epic_id) else {
            return;
        };
        let rollup = aggregate::rollup(
            epic.subtask_ids()
                .iter()
                .filter_map(|id| self.subtasks.get(id)),
        );
        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.apply(rollup);
        }
        self.reindex(epic_id, rollup.start.zip(rollup.end));
    }
}
