//! Bounded log buffer
//!
//! Incoming items land in a pending queue; a flush moves the whole queue
//! into the rendered sequence in one batch and then evicts from the head
//! until the capacity ceiling holds again. Batching keeps consumers from
//! redrawing once per line under heavy log throughput.

use std::collections::VecDeque;

/// Default rendered-buffer ceiling
pub const DEFAULT_CAPACITY: usize = 1000;

/// Capacity-bounded, insertion-ordered buffer with a pending queue
#[derive(Debug, Clone)]
pub struct LogBuffer<T> {
    capacity: usize,
    pending: Vec<T>,
    entries: VecDeque<T>,
}

impl<T> LogBuffer<T> {
    /// Creates an empty buffer; a capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            pending: Vec::new(),
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
        }
    }

    /// Queues an item for the next flush
    pub fn push(&mut self, item: T) {
        self.pending.push(item);
    }

    /// Moves every pending item into the buffer, oldest first
    ///
    /// # Returns
    /// How many items were moved (some of them may already have been
    /// evicted again if the batch exceeded the capacity)
    pub fn flush(&mut self) -> usize {
        let moved = self.pending.len();
        self.entries.extend(self.pending.drain(..));
        self.truncate();
        moved
    }

    /// Replaces the buffer contents and drops anything still pending
    pub fn replace(&mut self, items: impl IntoIterator<Item = T>) {
        self.pending.clear();
        self.entries.clear();
        self.entries.extend(items);
        self.truncate();
    }

    /// Empties both the buffer and the pending queue
    pub fn clear(&mut self) {
        self.pending.clear();
        self.entries.clear();
    }

    fn truncate(&mut self) {
        let excess = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..excess);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Iterates the rendered items, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Iterates the newest `n` rendered items, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &T> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }
}

impl<T: Clone> LogBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T> Default for LogBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
