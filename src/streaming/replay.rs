// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Offline replay of a recording through the engine, on recorded time

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use super::recorder::RecordedMessage;
use super::Publisher;
use crate::config::Settings;
use crate::core::{Clock, Engine, EventBus};

/// Outcome of a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Messages fed to the engine
    pub messages: usize,
    /// Messages the engine could not decode
    pub dropped: usize,
    /// Deferred events cancelled at the end of the recording
    pub still_pending: usize,
}

/// Feed `messages` through a fresh engine, spacing them as they were received.
///
/// The engine clock starts at the first message's timestamp and every message
/// is processed once tokio time has advanced by its offset from that start,
/// so deferrals, early ends and stale cut-offs behave as they did live. Run
/// it on a paused runtime to replay hours of traffic without waiting.
/// Timestamps never move backwards; a message without one is processed at
/// the time of the message before it.
pub async fn replay_recording(
    messages: &[RecordedMessage],
    settings: Settings,
    publisher: Arc<dyn Publisher>,
    bus: Arc<EventBus>,
) -> ReplaySummary {
    let base = messages.iter().find_map(RecordedMessage::timestamp);
    let clock = match base {
        Some(wall) => Clock::starting_at(wall),
        None => Clock::new(),
    };
    let origin = Instant::now();
    let base = base.unwrap_or_default();

    let drain = settings.rules.minimum_duration + Duration::from_secs(1);
    let engine = Engine::with_clock(settings, publisher, bus, clock);

    let mut summary = ReplaySummary::default();
    let mut cursor = base;
    for message in messages {
        if let Some(at) = message.timestamp() {
            cursor = cursor.max(at);
        }
        tokio::time::sleep_until(origin + Duration::from_secs_f64(cursor - base)).await;

        summary.messages += 1;
        if engine
            .process_payload(&message.topic, &message.payload_bytes())
            .is_err()
        {
            summary.dropped += 1;
        }
    }

    // give the last deferred events their chance to fire
    debug!("Recording exhausted, draining timers for {:?}", drain);
    tokio::time::sleep(drain).await;
    summary.still_pending = engine.shutdown();

    info!(
        "Replay finished: {} message(s), {} dropped, {} still pending",
        summary.messages, summary.dropped, summary.still_pending
    );
    summary
}
