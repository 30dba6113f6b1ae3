// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Table of ongoing events

use std::collections::HashMap;

use crate::events::EventSnapshot;

/// Latest known snapshot per ongoing event id
#[derive(Debug, Default)]
pub struct EventTable {
    events: HashMap<String, EventSnapshot>,
}

impl EventTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot for `id`
    pub fn get(&self, id: &str) -> Option<&EventSnapshot> {
        self.events.get(id)
    }

    /// Store `snapshot` as the latest revision, returning the one it supersedes
    pub fn insert(&mut self, snapshot: EventSnapshot) -> Option<EventSnapshot> {
        self.events.insert(snapshot.id.clone(), snapshot)
    }

    /// Forget `id`, returning its last snapshot
    pub fn remove(&mut self, id: &str) -> Option<EventSnapshot> {
        self.events.remove(id)
    }

    /// Number of ongoing events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event is ongoing
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All ongoing events, oldest first
    pub fn snapshots(&self) -> Vec<EventSnapshot> {
        let mut all: Vec<_> = self.events.values().cloned().collect();
        all.sort_by(|a, b| a.start_time.total_cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        all
    }
}
