// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Deferred evaluation queue with cancellable per-event timers

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::EventSnapshot;

/// Owned handle to a scheduled timer task
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    fn spawn<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self { task }
    }

    /// Stop the timer if it has not fired yet
    pub fn cancel(self) {
        self.task.abort();
    }
}

struct DeferredEntry {
    generation: u64,
    snapshots: Vec<EventSnapshot>,
    timer: TimerHandle,
}

/// What happened to a snapshot handed to [`DeferredQueue::defer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    /// A new entry was created and its timer started
    Scheduled {
        /// Generation handed to the timer callback
        generation: u64,
    },
    /// Appended to an existing entry, which now holds `buffered` snapshots
    Buffered {
        /// Snapshots now waiting in the entry
        buffered: usize,
    },
}

/// Snapshots held back per event until their timer fires.
///
/// At most one entry exists per event id. Each entry carries a generation
/// number handed to its timer callback; [`take`](Self::take) only yields the
/// entry the timer was created for, so a timer racing a cancellation (or a
/// newer entry under the same id) always finds nothing. Must be used under
/// the same lock the timer callback takes.
#[derive(Default)]
pub struct DeferredQueue {
    entries: HashMap<String, DeferredEntry>,
    next_generation: u64,
}

impl DeferredQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is waiting for its timer
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of events waiting for their timer
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no timer is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffer `snapshot` for its event.
    ///
    /// Appends to the existing entry without touching its timer, or creates
    /// an entry whose timer calls `on_fire(id, generation)` after `delay`.
    pub fn defer<F>(&mut self, snapshot: EventSnapshot, delay: Duration, on_fire: F) -> Deferral
    where
        F: FnOnce(String, u64) + Send + 'static,
    {
        if let Some(entry) = self.entries.get_mut(&snapshot.id) {
            entry.snapshots.push(snapshot);
            return Deferral::Buffered {
                buffered: entry.snapshots.len(),
            };
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let id = snapshot.id.clone();
        let timer = {
            let id = id.clone();
            TimerHandle::spawn(delay, move || on_fire(id, generation))
        };
        debug!("Deferring event {} for {:?}", id, delay);

        self.entries.insert(
            id,
            DeferredEntry {
                generation,
                snapshots: vec![snapshot],
                timer,
            },
        );
        Deferral::Scheduled { generation }
    }

    /// Remove and return the buffered snapshots of a fired timer.
    ///
    /// `None` when the entry was cancelled or replaced since the timer was
    /// scheduled.
    pub fn take(&mut self, id: &str, generation: u64) -> Option<Vec<EventSnapshot>> {
        match self.entries.get(id) {
            Some(entry) if entry.generation == generation => {
                self.entries.remove(id).map(|entry| entry.snapshots)
            }
            _ => None,
        }
    }

    /// Cancel the timer for `id` and discard its snapshots.
    ///
    /// Returns how many snapshots were discarded, `None` if nothing was pending.
    pub fn cancel(&mut self, id: &str) -> Option<usize> {
        let entry = self.entries.remove(id)?;
        entry.timer.cancel();
        Some(entry.snapshots.len())
    }

    /// Cancel every pending timer, returning how many were cancelled
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.timer.cancel();
        }
        count
    }
}

impl Drop for DeferredQueue {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
