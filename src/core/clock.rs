// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Wall-clock time anchored to the tokio clock

use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

/// Epoch-seconds clock that advances with `tokio::time::Instant`.
///
/// Event ages and cooldown windows are measured against Frigate's epoch
/// timestamps while timers run on tokio's clock; anchoring one to the other
/// keeps both views consistent, including under a paused test runtime.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor_wall: f64,
    anchor: Instant,
}

impl Clock {
    /// Clock reading the current wall time
    pub fn new() -> Self {
        let wall = Utc::now().timestamp_millis() as f64 / 1000.0;
        Self::starting_at(wall)
    }

    /// Clock whose current reading is `wall` epoch seconds
    pub fn starting_at(wall: f64) -> Self {
        Self {
            anchor_wall: wall,
            anchor: Instant::now(),
        }
    }

    /// Seconds since the Unix epoch
    pub fn now(&self) -> f64 {
        self.anchor_wall + self.anchor.elapsed().as_secs_f64()
    }

    /// Convert epoch seconds to a UTC timestamp
    pub fn to_utc(&self, epoch_secs: f64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt((epoch_secs * 1000.0).round() as i64)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_tokio_time() {
        let clock = Clock::starting_at(1_000.0);
        assert_eq!(clock.now(), 1_000.0);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!((clock.now() - 1_030.0).abs() < 1e-6);
        assert_eq!(clock.to_utc(1_030.0).timestamp(), 1_030);
    }
}
