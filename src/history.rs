//! View history: which records were read most recently
//!
//! [`RecencyTracker`] is a doubly linked list threaded through a slab of
//! nodes plus an id → slot map, giving O(1) touch and remove. Re-touching an
//! id moves it to the newest position instead of recording it twice.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::record::RecordId;

/// Recency tracking used by the record store on every successful read
pub trait ViewHistory {
    /// Record an access, moving `id` to the newest position
    fn touch(&mut self, id: RecordId);

    /// Forget `id`; unknown ids are ignored
    fn remove(&mut self, id: RecordId);

    /// Ids oldest first, newest last
    fn snapshot(&self) -> Vec<RecordId>;

    /// Forget every id
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    id: RecordId,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Duplicate-free access order with optional oldest-first eviction
#[derive(Debug, Clone, Default)]
pub struct RecencyTracker {
    nodes: Vec<Node>,
    free: Vec<usize>,
    slots: HashMap<RecordId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: Option<NonZeroUsize>,
}

impl RecencyTracker {
    /// Unbounded tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that evicts the least recently touched id once `capacity`
    /// distinct ids are held
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Ids newest first
    pub fn iter_newest(&self) -> impl Iterator<Item = RecordId> + '_ {
        std::iter::successors(self.tail, |&slot| self.nodes[slot].prev)
            .map(|slot| self.nodes[slot].id)
    }

    fn iter_oldest(&self) -> impl Iterator<Item = RecordId> + '_ {
        std::iter::successors(self.head, |&slot| self.nodes[slot].next)
            .map(|slot| self.nodes[slot].id)
    }

    fn allocate(&mut self, id: RecordId) -> usize {
        let node = Node {
            id,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn unlink(&mut self, slot: usize) {
        let Node { prev, next, .. } = self.nodes[slot];
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }

    fn push_back(&mut self, slot: usize) {
        self.nodes[slot].prev = self.tail;
        self.nodes[slot].next = None;
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn evict_oldest(&mut self) {
        if let Some(head) = self.head {
            let id = self.nodes[head].id;
            self.unlink(head);
            self.slots.remove(&id);
            self.free.push(head);
        }
    }
}

impl ViewHistory for RecencyTracker {
    fn touch(&mut self, id: RecordId) {
        if let Some(&slot) = self.slots.get(&id) {
            self.unlink(slot);
            self.push_back(slot);
            return;
        }

        if let Some(capacity) = self.capacity {
            if self.slots.len() >= capacity.get() {
                self.evict_oldest();
            }
        }

        let slot = self.allocate(id);
        self.slots.insert(id, slot);
        self.push_back(slot);
    }

    fn remove(&mut self, id: RecordId) {
        if let Some(slot) = self.slots.remove(&id) {
            self.unlink(slot);
            self.free.push(slot);
        }
    }

    fn snapshot(&self) -> Vec<RecordId> {
        self.iter_oldest().collect()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}
