//! Dirty tracking and the flush decision.

use std::time::{Duration, Instant};

/// Decides when a table's in-memory rows must be written to disk.
///
/// A flush is due right after a mutation once `change_threshold` changes
/// have accumulated or `time_threshold` has passed since the last flush.
/// Otherwise the write is deferred to a deadline that `tick` honours.
#[derive(Debug, Clone)]
pub struct FlushPolicy {
    dirty: bool,
    change_count: u64,
    last_save: Instant,
    deadline: Option<Instant>,
    change_threshold: u64,
    time_threshold: Duration,
}

impl FlushPolicy {
    pub fn new(change_threshold: u64, time_threshold: Duration) -> Self {
        Self {
            dirty: false,
            change_count: 0,
            last_save: Instant::now(),
            deadline: None,
            change_threshold,
            time_threshold,
        }
    }

    /// Records `changes` index mutations and (re)arms the deferred-flush deadline.
    pub fn mark_changed(&mut self, changes: u64) {
        if changes == 0 {
            return;
        }
        self.dirty = true;
        self.change_count += changes;
        self.deadline = Some(self.last_save + self.time_threshold);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    pub fn last_save(&self) -> Instant {
        self.last_save
    }

    /// Pending deadline for the deferred flush, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Flush decision made after a mutating operation completes.
    pub fn should_flush(&self, now: Instant) -> bool {
        self.dirty
            && (self.change_count >= self.change_threshold
                || now.saturating_duration_since(self.last_save) >= self.time_threshold)
    }

    /// True once the deferred-flush deadline has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.dirty && self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Clears dirty state after a successful write.
    pub fn flushed(&mut self, now: Instant) {
        self.dirty = false;
        self.change_count = 0;
        self.last_save = now;
        self.deadline = None;
    }
}
