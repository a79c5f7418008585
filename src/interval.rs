//! Interval index over scheduled records
//!
//! Keeps every scheduled record ordered by `(start, id)` so that conflict
//! lookups only visit entries starting before the candidate ends, and the
//! prioritized view is a plain ordered walk in either direction.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use crate::record::RecordId;

/// One indexed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: RecordId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Slot {
    /// Half-open overlap: `a.start < b.end && b.start < a.end`.
    /// An empty slot overlaps nothing.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < self.end && self.start < end && start < self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    by_start: BTreeMap<(NaiveDateTime, RecordId), NaiveDateTime>,
    starts: HashMap<RecordId, NaiveDateTime>,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.starts.contains_key(&id)
    }

    /// Index `id` over `[start, end)`, replacing any previous entry for it
    pub fn insert(&mut self, id: RecordId, start: NaiveDateTime, end: NaiveDateTime) {
        self.remove(id);
        self.by_start.insert((start, id), end);
        self.starts.insert(id, start);
    }

    pub fn remove(&mut self, id: RecordId) -> bool {
        match self.starts.remove(&id) {
            Some(start) => {
                self.by_start.remove(&(start, id));
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.by_start.clear();
        self.starts.clear();
    }

    pub fn get(&self, id: RecordId) -> Option<Slot> {
        let start = *self.starts.get(&id)?;
        let end = *self.by_start.get(&(start, id))?;
        Some(Slot { id, start, end })
    }

    /// First entry (by ascending start) overlapping `[start, end)`.
    ///
    /// Ids in `exclude` are skipped. Empty intervals on either side never
    /// conflict.
    pub fn conflicts_with(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: &[RecordId],
    ) -> Option<Slot> {
        if start >= end {
            return None;
        }
        self.by_start
            .range(..(end, RecordId::MIN))
            .map(|(&(slot_start, id), &slot_end)| Slot {
                id,
                start: slot_start,
                end: slot_end,
            })
            .find(|slot| !exclude.contains(&slot.id) && slot.overlaps(start, end))
    }

    /// All entries in ascending start order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Slot> + '_ {
        self.by_start
            .iter()
            .map(|(&(start, id), &end)| Slot { id, start, end })
    }
}
