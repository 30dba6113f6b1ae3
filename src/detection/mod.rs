// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Detection module - alert eligibility for event snapshots

mod cooldown;
mod zones;

pub use cooldown::CooldownTracker;
pub use zones::zone_match;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AlertRules, CameraPolicy};
use crate::events::EventSnapshot;

/// Why a snapshot did not produce an alert
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// Update changed nothing an alert depends on
    #[error("update was not significant")]
    NotSignificant,

    /// Event outlived the maximum duration
    #[error("event is {age:.0}s old, past the {limit}s maximum duration")]
    Stale {
        /// Event age in seconds
        age: f64,
        /// Configured maximum duration in seconds
        limit: u64,
    },

    /// Camera policy is disabled
    #[error("alerts are disabled for this camera")]
    CameraDisabled,

    /// Label missing from the camera's allow-list
    #[error("label is not in the camera's allow-list")]
    LabelNotAllowed,

    /// No required zone rule matched
    #[error("event is not in a required zone")]
    OutsideRequiredZones,

    /// An ignored zone rule matched
    #[error("event is in an ignored zone")]
    InIgnoredZone,

    /// Snapshot required but not yet available
    #[error("a snapshot is required but not available")]
    MissingSnapshot,

    /// Clip required but not yet available
    #[error("a video clip is required but not available")]
    MissingVideo,

    /// Camera alerted too recently
    #[error("camera cooldown active for another {remaining:.0}s")]
    CameraCooldown {
        /// Seconds left in the window
        remaining: f64,
    },

    /// Same label on this camera alerted too recently
    #[error("label cooldown active for another {remaining:.0}s")]
    LabelCooldown {
        /// Seconds left in the window
        remaining: f64,
    },
}

/// Outcome of evaluating one snapshot
pub type Verdict = Result<(), Rejection>;

/// Decide whether `current` should raise an alert.
///
/// Checks run in a fixed order and stop at the first failure. Cameras with
/// no policy alert on every significant, fresh event.
pub fn evaluate(
    previous: Option<&EventSnapshot>,
    current: &EventSnapshot,
    policy: Option<&CameraPolicy>,
    rules: &AlertRules,
    cooldown: &CooldownTracker,
    now: f64,
) -> Verdict {
    let verdict = check(previous, current, policy, rules, cooldown, now);
    match &verdict {
        Ok(()) => debug!(
            "Event {} (camera={}, label={}) is eligible for an alert",
            current.id, current.camera, current.label
        ),
        Err(rejection) => info!(
            "Alert for {} (camera={}, label={}, current_zones={:?}) discarded: {}",
            current.id, current.camera, current.label, current.current_zones, rejection
        ),
    }
    verdict
}

fn check(
    previous: Option<&EventSnapshot>,
    current: &EventSnapshot,
    policy: Option<&CameraPolicy>,
    rules: &AlertRules,
    cooldown: &CooldownTracker,
    now: f64,
) -> Verdict {
    if let Some(previous) = previous {
        if !current.differs_significantly(previous) {
            return Err(Rejection::NotSignificant);
        }
    }

    if !rules.maximum_duration.is_zero() {
        let age = current.age(now);
        if age > rules.maximum_duration.as_secs_f64() {
            return Err(Rejection::Stale {
                age,
                limit: rules.maximum_duration.as_secs(),
            });
        }
    }

    let Some(policy) = policy else {
        debug!("No configuration for camera {}, allowing", current.camera);
        return Ok(());
    };

    if !policy.enabled {
        return Err(Rejection::CameraDisabled);
    }

    if !policy.allows_label(&current.label) {
        return Err(Rejection::LabelNotAllowed);
    }

    let label = current.label();
    if !zone_match(&policy.zones.require, &current.current_zones, label, true) {
        return Err(Rejection::OutsideRequiredZones);
    }
    if zone_match(&policy.zones.ignore, &current.current_zones, label, false) {
        return Err(Rejection::InIgnoredZone);
    }

    if rules.require_snapshot && !current.has_snapshot {
        return Err(Rejection::MissingSnapshot);
    }
    if rules.require_video && !current.has_clip {
        return Err(Rejection::MissingVideo);
    }

    let windows = &rules.cooldown;
    if !cooldown.is_past(&current.camera, &current.label, windows.camera, windows.label, now) {
        if let Some(remaining) = cooldown.camera_remaining(&current.camera, windows.camera, now) {
            return Err(Rejection::CameraCooldown { remaining });
        }
        if let Some(remaining) =
            cooldown.label_remaining(&current.camera, &current.label, windows.label, now)
        {
            return Err(Rejection::LabelCooldown { remaining });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CooldownConfig, ZoneRule};
    use std::time::Duration;

    const NOW: f64 = 10_000.0;

    fn rules() -> AlertRules {
        AlertRules {
            cooldown: CooldownConfig {
                camera: Duration::ZERO,
                label: Duration::ZERO,
            },
            ..AlertRules::default()
        }
    }

    fn person() -> EventSnapshot {
        EventSnapshot::new("e1", "front_door", "person", NOW - 5.0)
    }

    fn run(
        previous: Option<&EventSnapshot>,
        current: &EventSnapshot,
        policy: Option<&CameraPolicy>,
        rules: &AlertRules,
    ) -> Verdict {
        evaluate(previous, current, policy, rules, &CooldownTracker::new(), NOW)
    }

    #[test]
    fn test_unchanged_update_is_not_significant() {
        let event = person();
        assert_eq!(run(Some(&event), &event, None, &rules()), Err(Rejection::NotSignificant));
        assert_eq!(run(None, &event, None, &rules()), Ok(()));
    }

    #[test]
    fn test_stale_event() {
        let mut rules = rules();
        rules.maximum_duration = Duration::from_secs(3);
        assert!(matches!(
            run(None, &person(), None, &rules),
            Err(Rejection::Stale { limit: 3, .. })
        ));

        rules.maximum_duration = Duration::from_secs(30);
        assert_eq!(run(None, &person(), None, &rules), Ok(()));
    }

    #[test]
    fn test_policy_gates() {
        let mut policy = CameraPolicy::new("front_door", &["car"]);
        assert_eq!(
            run(None, &person(), Some(&policy), &rules()),
            Err(Rejection::LabelNotAllowed)
        );

        policy.labels.push("person".into());
        assert_eq!(run(None, &person(), Some(&policy), &rules()), Ok(()));

        policy.enabled = false;
        assert_eq!(
            run(None, &person(), Some(&policy), &rules()),
            Err(Rejection::CameraDisabled)
        );

        let empty = CameraPolicy::new("front_door", &[]);
        assert_eq!(
            run(None, &person(), Some(&empty), &rules()),
            Err(Rejection::LabelNotAllowed)
        );
    }

    #[test]
    fn test_required_zone_rejects_regardless_of_label() {
        let mut policy = CameraPolicy::new("front_door", &["*"]);
        policy.zones.require.push(ZoneRule::new("driveway", &["*"]));

        for label in ["person", "car", "dog"] {
            let mut event = EventSnapshot::new("e", "front_door", label, NOW);
            event.current_zones.insert("yard".into());
            assert_eq!(
                run(None, &event, Some(&policy), &rules()),
                Err(Rejection::OutsideRequiredZones)
            );
        }

        let mut inside = person();
        inside.current_zones.insert("driveway".into());
        assert_eq!(run(None, &inside, Some(&policy), &rules()), Ok(()));
    }

    #[test]
    fn test_ignored_zone() {
        let mut policy = CameraPolicy::new("front_door", &["person", "car"]);
        policy.zones.ignore.push(ZoneRule::new("street", &["car"]));

        let mut car = EventSnapshot::new("c", "front_door", "car", NOW);
        car.current_zones.insert("street".into());
        assert_eq!(run(None, &car, Some(&policy), &rules()), Err(Rejection::InIgnoredZone));

        let mut walker = person();
        walker.current_zones.insert("street".into());
        assert_eq!(run(None, &walker, Some(&policy), &rules()), Ok(()));
    }

    #[test]
    fn test_media_requirements() {
        let mut rules = rules();
        rules.require_snapshot = true;
        rules.require_video = true;

        let mut event = person();
        assert_eq!(run(None, &event, None, &rules), Ok(()));

        let policy = CameraPolicy::new("front_door", &["person"]);
        assert_eq!(run(None, &event, Some(&policy), &rules), Err(Rejection::MissingSnapshot));
        event.has_snapshot = true;
        assert_eq!(run(None, &event, Some(&policy), &rules), Err(Rejection::MissingVideo));
        event.has_clip = true;
        assert_eq!(run(None, &event, Some(&policy), &rules), Ok(()));
    }

    #[test]
    fn test_cooldown_suppression() {
        let mut rules = rules();
        rules.cooldown.label = Duration::from_secs(60);
        let policy = CameraPolicy::new("front_door", &["person", "car"]);

        let mut tracker = CooldownTracker::new();
        tracker.record("front_door", "person", NOW - 10.0);

        let verdict = evaluate(None, &person(), Some(&policy), &rules, &tracker, NOW);
        assert_eq!(verdict, Err(Rejection::LabelCooldown { remaining: 50.0 }));

        let car = EventSnapshot::new("c", "front_door", "car", NOW);
        assert_eq!(evaluate(None, &car, Some(&policy), &rules, &tracker, NOW), Ok(()));

        rules.cooldown.camera = Duration::from_secs(60);
        assert!(matches!(
            evaluate(None, &car, Some(&policy), &rules, &tracker, NOW),
            Err(Rejection::CameraCooldown { .. })
        ));
    }
}
