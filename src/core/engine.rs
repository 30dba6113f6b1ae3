// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Event correlation engine - turns Frigate lifecycle messages into alerts

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::event_bus::{EngineEventKind, EventBus};
use super::event_table::EventTable;
use super::scheduler::{DeferredQueue, Deferral};
use crate::config::Settings;
use crate::detection::{self, CooldownTracker};
use crate::error::{DecodeError, EngineError};
use crate::events::{EventSnapshot, LifecycleMessage};
use crate::streaming::{Notification, Publisher};

/// Everything that outlives a single message, guarded by one lock
struct EngineState {
    settings: Arc<Settings>,
    ongoing: EventTable,
    deferred: DeferredQueue,
    cooldown: CooldownTracker,
    stopped: bool,
}

struct Shared {
    state: Mutex<EngineState>,
    publisher: Arc<dyn Publisher>,
    bus: Arc<EventBus>,
    clock: Clock,
}

/// Engine façade handed to the transport.
///
/// Cheap to clone; clones share state. Messages are expected to arrive from
/// a single consumer task in broker order, while deferred replays run on
/// their own timer tasks. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Engine on the system clock publishing alerts through `publisher`
    pub fn new(settings: Settings, publisher: Arc<dyn Publisher>, bus: Arc<EventBus>) -> Self {
        Self::with_clock(settings, publisher, bus, Clock::new())
    }

    /// Engine whose notion of "now" comes from `clock`
    pub fn with_clock(
        settings: Settings,
        publisher: Arc<dyn Publisher>,
        bus: Arc<EventBus>,
        clock: Clock,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    settings: Arc::new(settings),
                    ongoing: EventTable::new(),
                    deferred: DeferredQueue::new(),
                    cooldown: CooldownTracker::new(),
                    stopped: false,
                }),
                publisher,
                bus,
                clock,
            }),
        }
    }

    /// Decode and process one raw payload from `topic`.
    ///
    /// Malformed payloads are logged, reported on the event bus and dropped.
    pub fn process_payload(&self, topic: &str, payload: &[u8]) -> Result<(), DecodeError> {
        match LifecycleMessage::decode(payload) {
            Ok(message) => {
                self.process(message);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to decode message from topic {}: {}", topic, e);
                self.shared.bus.emit(
                    None,
                    EngineEventKind::DecodeFailed {
                        topic: topic.to_string(),
                        reason: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Process one lifecycle message
    pub fn process(&self, message: LifecycleMessage) {
        let kind = message.kind();
        self.shared.bus.emit(
            Some(message.event_id()),
            EngineEventKind::Received { message: kind },
        );

        match message {
            LifecycleMessage::New(event) => {
                info!(
                    "NEW: {}, camera={}, label={}, score={}",
                    event.id, event.camera, event.label, event.score
                );
                self.shared.accept(event);
            }
            LifecycleMessage::Update(event) => {
                info!(
                    "UPD: {}, camera={}, label={}, score={}",
                    event.id, event.camera, event.label, event.score
                );
                self.shared.accept(event);
            }
            LifecycleMessage::End(event) => {
                info!("DEL: {}", event.id);
                self.shared.end(&event.id);
            }
        }
    }

    /// Swap in a new configuration snapshot.
    ///
    /// Ongoing events, pending deferrals and cooldown records are kept;
    /// timers already running keep the delay they were started with.
    pub fn reconfigure(&self, settings: Settings) {
        let mut state = self.shared.state.lock();
        state.settings = Arc::new(settings);
        info!(
            "Configuration applied ({} camera policies, {} pending deferrals kept)",
            state.settings.cameras.len(),
            state.deferred.len()
        );
        drop(state);
        self.shared.bus.emit(None, EngineEventKind::Reconfigured);
    }

    /// Configuration snapshot currently in effect
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.shared.state.lock().settings)
    }

    /// Ongoing events, oldest first
    pub fn ongoing_events(&self) -> Vec<EventSnapshot> {
        self.shared.state.lock().ongoing.snapshots()
    }

    /// Latest snapshot of an ongoing event
    pub fn describe(&self, id: &str) -> Result<EventSnapshot, EngineError> {
        self.shared
            .state
            .lock()
            .ongoing
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Publish an alert for an ongoing event, skipping evaluation
    pub fn force_alert(&self, id: &str) -> Result<Notification, EngineError> {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        let event = state
            .ongoing
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        info!("Manual alert requested for {}", id);
        self.shared.publish_alert(&mut state, &event, now)
    }

    /// Number of events waiting for their minimum duration
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().deferred.len()
    }

    /// Cancel every outstanding timer; returns how many were cancelled.
    ///
    /// New and update messages processed afterwards are ignored, so no
    /// timer outlives the call.
    pub fn shutdown(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.stopped = true;
        let cancelled = state.deferred.cancel_all();
        drop(state);
        info!("Engine stopped, {} pending deferrals cancelled", cancelled);
        cancelled
    }
}

impl Shared {
    /// Route a new/update snapshot through the deferral gate
    fn accept(self: &Arc<Self>, event: EventSnapshot) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if state.stopped {
            debug!("Engine stopped, ignoring {}", event.id);
            return;
        }

        let delay = if state.deferred.contains(&event.id) {
            // the entry's own timer decides when this replays
            Duration::ZERO
        } else {
            let minimum = state.settings.rules.minimum_duration.as_secs_f64();
            let left = minimum - event.age(now);
            if left <= 0.0 {
                let previous = state.ongoing.get(&event.id).cloned();
                self.decide(&mut state, previous.as_ref(), &event, now);
                state.ongoing.insert(event);
                return;
            }
            Duration::from_secs_f64(left)
        };

        let id = event.id.clone();
        let weak: Weak<Shared> = Arc::downgrade(self);
        let deferral = state.deferred.defer(event, delay, move |id, generation| {
            if let Some(shared) = weak.upgrade() {
                shared.replay(&id, generation);
            }
        });

        let buffered = match deferral {
            Deferral::Scheduled { .. } => {
                debug!("Event {} deferred for {:.1}s", id, delay.as_secs_f64());
                1
            }
            Deferral::Buffered { buffered } => {
                debug!("Event {} update buffered ({} pending)", id, buffered);
                buffered
            }
        };
        drop(state);
        self.bus.emit(Some(&id), EngineEventKind::Deferred { buffered });
    }

    /// Timer callback: evaluate everything buffered for `id`, oldest first
    fn replay(&self, id: &str, generation: u64) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let Some(snapshots) = state.deferred.take(id, generation) else {
            debug!("Timer for {} fired after cancellation, ignoring", id);
            return;
        };
        debug!("Replaying {} buffered snapshot(s) for {}", snapshots.len(), id);

        let mut previous = state.ongoing.get(id).cloned();
        for snapshot in snapshots {
            self.decide(&mut state, previous.as_ref(), &snapshot, now);
            previous = Some(snapshot);
        }
        if let Some(latest) = previous {
            state.ongoing.insert(latest);
        }
    }

    fn end(&self, id: &str) {
        let mut state = self.state.lock();
        let cancelled = state.deferred.cancel(id);
        let removed = state.ongoing.remove(id);
        drop(state);

        if let Some(discarded) = cancelled {
            info!("Event {} ended before its minimum duration, {} update(s) discarded", id, discarded);
            self.bus.emit(Some(id), EngineEventKind::Cancelled { discarded });
        }
        if removed.is_none() && cancelled.is_none() {
            debug!("End for unknown event {}", id);
        }
        self.bus.emit(Some(id), EngineEventKind::Ended);
    }

    /// Evaluate one snapshot and publish if it qualifies
    fn decide(
        &self,
        state: &mut EngineState,
        previous: Option<&EventSnapshot>,
        current: &EventSnapshot,
        now: f64,
    ) -> bool {
        let settings = Arc::clone(&state.settings);
        let verdict = detection::evaluate(
            previous,
            current,
            settings.policy(&current.camera),
            &settings.rules,
            &state.cooldown,
            now,
        );

        match verdict {
            Ok(()) => match self.publish_alert(state, current, now) {
                Ok(_) => true,
                Err(e) => {
                    warn!("{}", e);
                    false
                }
            },
            Err(rejection) => {
                self.bus
                    .emit(Some(&current.id), EngineEventKind::Rejected { rejection });
                false
            }
        }
    }

    /// Build, publish and record an alert. Cooldowns start only here.
    fn publish_alert(
        &self,
        state: &mut EngineState,
        event: &EventSnapshot,
        now: f64,
    ) -> Result<Notification, EngineError> {
        let notification =
            Notification::for_event(event, &state.settings.api_base_url, self.clock.to_utc(now));
        let payload = notification
            .to_payload()
            .map_err(|e| EngineError::encode(&event.id, &e))?;

        info!("ALERT: {} -> {}", event.id, notification.message);
        self.publisher.publish(&state.settings.alert_topic, payload);
        state.cooldown.record(&event.camera, &event.label, now);

        self.bus.emit(
            Some(&event.id),
            EngineEventKind::Alerted {
                notification: notification.clone(),
            },
        );
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlertRules, CameraPolicy, CooldownConfig, ZoneRule};
    use crate::core::EngineEvent;
    use crate::detection::Rejection;
    use tokio::sync::broadcast;

    const T0: f64 = 1_718_000_000.0;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl RecordingPublisher {
        fn alerts(&self) -> Vec<Notification> {
            self.sent
                .lock()
                .iter()
                .map(|(_, payload)| serde_json::from_slice(payload).unwrap())
                .collect()
        }

        fn topics(&self) -> Vec<String> {
            self.sent.lock().iter().map(|(topic, _)| topic.clone()).collect()
        }
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, topic: &str, payload: Vec<u8>) {
            self.sent.lock().push((topic.to_string(), payload));
        }
    }

    struct Harness {
        engine: Engine,
        publisher: Arc<RecordingPublisher>,
        events: broadcast::Receiver<EngineEvent>,
    }

    impl Harness {
        fn new(rules: AlertRules, cameras: Vec<CameraPolicy>) -> Self {
            let mut settings = Settings::default();
            settings.rules = rules;
            settings.cameras = cameras.into_iter().map(|p| (p.camera.clone(), p)).collect();

            let publisher = Arc::new(RecordingPublisher::default());
            let bus = Arc::new(EventBus::new(256));
            let events = bus.subscribe();
            let engine = Engine::with_clock(
                settings,
                publisher.clone(),
                bus,
                Clock::starting_at(T0),
            );
            Self {
                engine,
                publisher,
                events,
            }
        }

        fn send(&self, kind: &str, event: &EventSnapshot) {
            let section = if kind == "end" { "before" } else { "after" };
            let mut message = serde_json::Map::new();
            message.insert("type".to_string(), kind.into());
            message.insert(section.to_string(), serde_json::to_value(event).unwrap());
            let payload = serde_json::to_vec(&message).unwrap();
            self.engine.process_payload("frigate/events", &payload).unwrap();
        }

        fn rejections(&mut self) -> Vec<Rejection> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                if let EngineEventKind::Rejected { rejection } = event.kind {
                    out.push(rejection);
                }
            }
            out
        }

        fn outcomes(&mut self) -> Vec<&'static str> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                match event.kind {
                    EngineEventKind::Alerted { .. } => out.push("alerted"),
                    EngineEventKind::Rejected { .. } => out.push("rejected"),
                    _ => {}
                }
            }
            out
        }
    }

    fn no_cooldown() -> AlertRules {
        AlertRules {
            cooldown: CooldownConfig {
                camera: Duration::ZERO,
                label: Duration::ZERO,
            },
            ..AlertRules::default()
        }
    }

    fn deferred_rules(seconds: u64) -> AlertRules {
        AlertRules {
            minimum_duration: Duration::from_secs(seconds),
            ..no_cooldown()
        }
    }

    fn person(id: &str) -> EventSnapshot {
        EventSnapshot::new(id, "front_door", "person", T0)
    }

    async fn sleep(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_alert_and_unchanged_update() {
        let mut h = Harness::new(no_cooldown(), vec![]);
        let event = person("e1");

        h.send("new", &event);
        h.send("update", &event);

        assert_eq!(h.publisher.alerts().len(), 1);
        assert_eq!(h.publisher.topics(), vec!["frigate_alerts/alert"]);
        assert_eq!(h.rejections(), vec![Rejection::NotSignificant]);
        assert_eq!(h.engine.describe("e1").unwrap(), event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_significant_update_alerts_again() {
        let h = Harness::new(no_cooldown(), vec![]);
        let mut event = person("e1");
        h.send("new", &event);

        event.has_snapshot = true;
        h.send("update", &event);

        let alerts = h.publisher.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].image, None);
        assert_eq!(
            alerts[1].image.as_deref(),
            Some("http://localhost:5000/api/events/e1/thumbnail.jpg")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_before_minimum_duration_never_alerts() {
        let h = Harness::new(deferred_rules(30), vec![CameraPolicy::new("front_door", &["person"])]);
        let mut event = person("E1");

        h.send("new", &event);
        for zone in ["porch", "steps", "driveway"] {
            sleep(2).await;
            event.current_zones.insert(zone.to_string());
            h.send("update", &event);
        }
        assert_eq!(h.engine.pending_count(), 1);

        sleep(4).await;
        h.send("end", &event);
        assert_eq!(h.engine.pending_count(), 0);

        sleep(60).await;
        assert!(h.publisher.alerts().is_empty());
        assert!(h.engine.describe("E1").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_event_alerts_after_minimum_duration() {
        let h = Harness::new(deferred_rules(30), vec![CameraPolicy::new("front_door", &["person"])]);

        h.send("new", &person("E2"));
        sleep(29).await;
        assert!(h.publisher.alerts().is_empty());
        // not visible as ongoing until the replay runs
        assert!(h.engine.describe("E2").is_err());

        sleep(2).await;
        let alerts = h.publisher.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.contains("Person"));
        assert!(alerts[0].message.contains("Front Door"));
        assert!(alerts[0].timestamp.timestamp() >= (T0 as i64) + 30);
        assert!(h.engine.describe("E2").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_threads_previous_in_order() {
        let mut h = Harness::new(deferred_rules(10), vec![]);
        let s1 = person("e");
        let s2 = s1.clone();
        let mut s3 = s1.clone();
        s3.current_zones.insert("porch".into());

        h.send("new", &s1);
        h.send("update", &s2);
        h.send("update", &s3);
        sleep(11).await;

        // (None, s1) alerts, (s1, s2) is unchanged, (s2, s3) entered a zone
        assert_eq!(h.outcomes(), vec!["alerted", "rejected", "alerted"]);
        assert_eq!(h.engine.describe("e").unwrap(), s3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_cooldown_suppresses_second_event() {
        let rules = AlertRules {
            cooldown: CooldownConfig {
                camera: Duration::from_secs(60),
                label: Duration::ZERO,
            },
            ..AlertRules::default()
        };
        let mut h = Harness::new(rules, vec![CameraPolicy::new("front_door", &["person", "car"])]);

        h.send("new", &person("first"));
        sleep(10).await;
        h.send("new", &EventSnapshot::new("second", "front_door", "car", T0 + 10.0));

        assert_eq!(h.publisher.alerts().len(), 1);
        assert!(matches!(
            h.rejections().as_slice(),
            [Rejection::CameraCooldown { .. }]
        ));

        sleep(60).await;
        h.send("new", &EventSnapshot::new("third", "front_door", "car", T0 + 70.0));
        assert_eq!(h.publisher.alerts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_zone_mismatch() {
        let mut policy = CameraPolicy::new("front_door", &["*"]);
        policy.zones.require.push(ZoneRule::new("driveway", &["*"]));
        let mut h = Harness::new(no_cooldown(), vec![policy]);

        let mut event = person("z");
        event.current_zones.insert("yard".into());
        h.send("new", &event);

        assert!(h.publisher.alerts().is_empty());
        assert_eq!(h.rejections(), vec![Rejection::OutsideRequiredZones]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_evaluation_does_not_start_cooldown() {
        let rules = AlertRules {
            require_snapshot: true,
            ..AlertRules::default()
        };
        let h = Harness::new(rules, vec![CameraPolicy::new("front_door", &["person"])]);

        let mut event = person("m");
        h.send("new", &event);
        assert!(h.publisher.alerts().is_empty());

        event.has_snapshot = true;
        h.send("update", &event);
        assert_eq!(h.publisher.alerts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_id_reused_after_end_starts_fresh() {
        let h = Harness::new(no_cooldown(), vec![]);
        let event = person("r");

        h.send("new", &event);
        h.send("end", &event);
        h.send("end", &event);
        h.send("new", &event);

        // no carried-over previous, so the identical snapshot alerts again
        assert_eq!(h.publisher.alerts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_is_dropped() {
        let mut h = Harness::new(no_cooldown(), vec![]);
        assert!(h.engine.process_payload("frigate/events", b"{oops").is_err());

        let failed = h
            .events
            .try_recv()
            .map(|e| matches!(e.kind, EngineEventKind::DecodeFailed { .. }))
            .unwrap_or(false);
        assert!(failed);

        h.send("new", &person("ok"));
        assert_eq!(h.publisher.alerts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_timers() {
        let h = Harness::new(deferred_rules(30), vec![]);
        h.send("new", &person("a"));
        h.send("new", &person("b"));

        assert_eq!(h.engine.shutdown(), 2);
        sleep(60).await;
        assert!(h.publisher.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_after_shutdown_are_ignored() {
        let h = Harness::new(deferred_rules(30), vec![]);
        assert_eq!(h.engine.shutdown(), 0);

        h.send("new", &person("late"));
        assert_eq!(h.engine.pending_count(), 0);
        assert!(h.engine.describe("late").is_err());

        sleep(60).await;
        assert!(h.publisher.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_keeps_pending_deferrals() {
        let h = Harness::new(deferred_rules(30), vec![]);
        h.send("new", &person("p"));

        let mut settings = (*h.engine.settings()).clone();
        settings.cameras.insert(
            "front_door".into(),
            CameraPolicy::new("front_door", &["person"]),
        );
        h.engine.reconfigure(settings);
        assert_eq!(h.engine.pending_count(), 1);

        sleep(31).await;
        assert_eq!(h.publisher.alerts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_alert_and_lookup() {
        let policy = CameraPolicy {
            enabled: false,
            ..CameraPolicy::new("front_door", &["person"])
        };
        let h = Harness::new(no_cooldown(), vec![policy]);
        h.send("new", &person("f"));
        assert!(h.publisher.alerts().is_empty());

        let notification = h.engine.force_alert("f").unwrap();
        assert_eq!(notification.id, "f");
        assert_eq!(h.publisher.alerts().len(), 1);

        assert_eq!(
            h.engine.force_alert("missing"),
            Err(EngineError::NotFound("missing".into()))
        );
        assert_eq!(h.engine.ongoing_events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_event_rejected() {
        let rules = AlertRules {
            maximum_duration: Duration::from_secs(60),
            ..no_cooldown()
        };
        let mut h = Harness::new(rules, vec![]);
        h.send("new", &EventSnapshot::new("old", "front_door", "person", T0 - 600.0));

        assert!(h.publisher.alerts().is_empty());
        assert!(matches!(h.rejections().as_slice(), [Rejection::Stale { .. }]));
    }
}
