// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Alert cooldown bookkeeping

use std::collections::HashMap;
use std::time::Duration;

/// Last alert time per camera and per (camera, label).
///
/// Records are overwritten on every published alert and never expire on
/// their own; an old record simply stops suppressing anything.
#[derive(Debug, Default, Clone)]
pub struct CooldownTracker {
    by_camera: HashMap<String, f64>,
    by_label: HashMap<(String, String), f64>,
}

impl CooldownTracker {
    /// Tracker with no alerts recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that an alert for `camera`/`label` went out at `timestamp`
    pub fn record(&mut self, camera: &str, label: &str, timestamp: f64) {
        self.by_camera.insert(camera.to_string(), timestamp);
        self.by_label
            .insert((camera.to_string(), label.to_string()), timestamp);
    }

    /// Seconds until the camera window lapses, `None` when not suppressed
    pub fn camera_remaining(&self, camera: &str, window: Duration, now: f64) -> Option<f64> {
        remaining(self.by_camera.get(camera).copied(), window, now)
    }

    /// Seconds until the camera+label window lapses, `None` when not suppressed
    pub fn label_remaining(&self, camera: &str, label: &str, window: Duration, now: f64) -> Option<f64> {
        let last = self
            .by_label
            .get(&(camera.to_string(), label.to_string()))
            .copied();
        remaining(last, window, now)
    }

    /// True when neither window suppresses an alert at `now`
    pub fn is_past(
        &self,
        camera: &str,
        label: &str,
        camera_window: Duration,
        label_window: Duration,
        now: f64,
    ) -> bool {
        if camera_window.is_zero() && label_window.is_zero() {
            return true;
        }
        self.camera_remaining(camera, camera_window, now).is_none()
            && self.label_remaining(camera, label, label_window, now).is_none()
    }
}

fn remaining(last: Option<f64>, window: Duration, now: f64) -> Option<f64> {
    if window.is_zero() {
        return None;
    }
    let elapsed = now - last?;
    let left = window.as_secs_f64() - elapsed;
    (left > 0.0).then_some(left)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_no_record_is_past() {
        let tracker = CooldownTracker::new();
        assert!(tracker.is_past("yard", "person", MINUTE, MINUTE, 1000.0));
    }

    #[test]
    fn test_window_monotonicity() {
        let mut tracker = CooldownTracker::new();
        let t = 1_000.0;
        tracker.record("yard", "person", t);

        for dt in [0.001, 1.0, 30.0, 59.999] {
            assert!(!tracker.is_past("yard", "person", MINUTE, MINUTE, t + dt), "dt={}", dt);
        }
        for dt in [60.0, 61.0, 3600.0] {
            assert!(tracker.is_past("yard", "person", MINUTE, MINUTE, t + dt), "dt={}", dt);
        }
    }

    #[test]
    fn test_disabled_windows() {
        let mut tracker = CooldownTracker::new();
        tracker.record("yard", "person", 100.0);
        assert!(tracker.is_past("yard", "person", Duration::ZERO, Duration::ZERO, 100.0));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut tracker = CooldownTracker::new();
        tracker.record("yard", "person", 100.0);

        // camera window blocks any label on the same camera
        assert!(!tracker.is_past("yard", "car", MINUTE, Duration::ZERO, 110.0));
        // label window alone only blocks the same label
        assert!(tracker.is_past("yard", "car", Duration::ZERO, MINUTE, 110.0));
        assert!(!tracker.is_past("yard", "person", Duration::ZERO, MINUTE, 110.0));
        // other cameras are unaffected
        assert!(tracker.is_past("porch", "person", MINUTE, MINUTE, 110.0));

        assert_eq!(tracker.camera_remaining("yard", MINUTE, 110.0), Some(50.0));
    }
}
