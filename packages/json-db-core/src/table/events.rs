//! Listener registry for insert/update/delete/get notifications.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::query::Query;
use super::Row;

/// Operation a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Update,
    Delete,
    Get,
}

/// Notification fired after a completed operation.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Insert {
        row: &'a Row,
        position: usize,
    },
    Update {
        before: &'a Row,
        after: &'a Row,
        position: usize,
        patch: &'a Row,
    },
    Delete {
        row: &'a Row,
        position: usize,
    },
    Get {
        query: &'a Query,
        rows: &'a [Row],
    },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Insert { .. } => EventKind::Insert,
            Event::Update { .. } => EventKind::Update,
            Event::Delete { .. } => EventKind::Delete,
            Event::Get { .. } => EventKind::Get,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener callback. An `Err` is logged and discarded.
pub type Listener = dyn Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, EventKind, Box<Listener>)>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl Listeners {
    pub(crate) fn add(&mut self, kind: EventKind, listener: Box<Listener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, kind, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Calls every listener registered for the event's kind.
    ///
    /// Listener errors and panics never reach the caller.
    pub(crate) fn emit(&self, table: &str, event: Event<'_>) {
        let kind = event.kind();
        for (id, _, listener) in self.entries.iter().filter(|(_, k, _)| *k == kind) {
            match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Listener {:?} on table {} failed: {}", id, table, e);
                }
                Err(_) => {
                    tracing::warn!("Listener {:?} on table {} panicked", id, table);
                }
            }
        }
    }
}
