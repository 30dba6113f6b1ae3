// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Event bus carrying the engine's decisions to observers

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::detection::Rejection;
use crate::events::MessageKind;
use crate::streaming::Notification;

/// What the engine did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEventKind {
    /// A lifecycle message was accepted for processing
    Received {
        /// Lifecycle stage of the message
        message: MessageKind,
    },
    /// Snapshot held back until the minimum duration has elapsed
    Deferred {
        /// Snapshots now waiting for the event
        buffered: usize,
    },
    /// Pending snapshots discarded because the event ended early
    Cancelled {
        /// Snapshots dropped with the deferral
        discarded: usize,
    },
    /// A snapshot was evaluated and did not alert
    Rejected {
        /// First eligibility check that failed
        rejection: Rejection,
    },
    /// An alert was published
    Alerted {
        /// Payload that was published
        notification: Notification,
    },
    /// The event left the ongoing table
    Ended,
    /// An inbound payload could not be decoded
    DecodeFailed {
        /// Topic the payload arrived on
        topic: String,
        /// Decoder error message
        reason: String,
    },
    /// A new configuration snapshot was applied
    Reconfigured,
}

/// One observation emitted by the engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineEvent {
    /// Emission order, starting at 0
    pub seq: u64,
    /// Wall-clock time of emission
    pub timestamp: DateTime<Utc>,
    /// Frigate event the observation concerns, if any
    pub event_id: Option<String>,
    /// What happened
    pub kind: EngineEventKind,
}

/// Broadcast sink for engine observations.
///
/// Sending never blocks and is dropped silently when nobody listens.
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    counter: AtomicU64,
}

impl EventBus {
    /// Bus whose subscribers may lag by up to `capacity` observations
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            counter: AtomicU64::new(0),
        }
    }

    /// Publish an observation to current subscribers
    pub fn emit(&self, event_id: Option<&str>, kind: EngineEventKind) {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let _ = self.tx.send(EngineEvent {
            seq,
            timestamp: Utc::now(),
            event_id: event_id.map(str::to_string),
            kind,
        });
    }

    /// Receive every observation emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Number of observations emitted so far
    pub fn emitted(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
