// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Frigate event snapshots and lifecycle messages

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Decoded state of one event at one point of its lifecycle.
///
/// Fields the engine does not decide on (`frame_time`, `box`, `region`,
/// stationary counters, ...) are kept verbatim in `extra` so the raw view
/// of an event survives a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Frigate event id
    pub id: String,

    /// Camera that produced the event
    #[serde(default, deserialize_with = "nullable")]
    pub camera: String,

    /// Detected object label, empty when absent
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,

    /// Recognised sub labels (faces, plates, ...)
    #[serde(default, rename = "sub_label", deserialize_with = "sub_labels")]
    pub sub_labels: Vec<String>,

    /// Current detection score
    #[serde(default, deserialize_with = "nullable")]
    pub score: f64,

    /// Best score seen so far
    #[serde(default)]
    pub top_score: Option<f64>,

    /// Seconds since the Unix epoch
    #[serde(default, deserialize_with = "nullable")]
    pub start_time: f64,

    /// Seconds since the Unix epoch, once the event ended
    #[serde(default)]
    pub end_time: Option<f64>,

    /// Zones the object is in now
    #[serde(default, deserialize_with = "nullable")]
    pub current_zones: BTreeSet<String>,

    /// Zones the object has entered at any point
    #[serde(default, deserialize_with = "nullable")]
    pub entered_zones: BTreeSet<String>,

    /// A recording clip is available
    #[serde(default, deserialize_with = "nullable")]
    pub has_clip: bool,

    /// A snapshot image is available
    #[serde(default, deserialize_with = "nullable")]
    pub has_snapshot: bool,

    /// Pass-through fields not consumed by the engine
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventSnapshot {
    /// Minimal snapshot, mostly useful for tests and manual injection
    pub fn new(id: impl Into<String>, camera: impl Into<String>, label: impl Into<String>, start_time: f64) -> Self {
        Self {
            id: id.into(),
            camera: camera.into(),
            label: label.into(),
            sub_labels: Vec::new(),
            score: 0.0,
            top_score: None,
            start_time,
            end_time: None,
            current_zones: BTreeSet::new(),
            entered_zones: BTreeSet::new(),
            has_clip: false,
            has_snapshot: false,
            extra: Map::new(),
        }
    }

    /// Seconds the event has existed at `now`, never negative
    pub fn age(&self, now: f64) -> f64 {
        (now - self.start_time).max(0.0)
    }

    /// The label, or `None` when Frigate sent none
    pub fn label(&self) -> Option<&str> {
        if self.label.is_empty() {
            None
        } else {
            Some(&self.label)
        }
    }

    /// Whether this snapshot changed anything an alert depends on.
    ///
    /// Media flags only count when they flip from unavailable to available.
    pub fn differs_significantly(&self, previous: &EventSnapshot) -> bool {
        previous.label != self.label
            || previous.sub_labels != self.sub_labels
            || previous.current_zones != self.current_zones
            || previous.entered_zones != self.entered_zones
            || (!previous.has_clip && self.has_clip)
            || (!previous.has_snapshot && self.has_snapshot)
    }
}

/// Lifecycle stage carried in a message's `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Event started
    New,
    /// Event changed
    Update,
    /// Event finished
    End,
}

impl MessageKind {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::New => "new",
            MessageKind::Update => "update",
            MessageKind::End => "end",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded message from the Frigate events topic
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleMessage {
    /// An event was first detected (`after` section)
    New(EventSnapshot),
    /// An ongoing event changed (`after` section)
    Update(EventSnapshot),
    /// The event finished (`before` section)
    End(EventSnapshot),
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(default)]
    before: Option<EventSnapshot>,
    #[serde(default)]
    after: Option<EventSnapshot>,
}

impl LifecycleMessage {
    /// Decode a raw MQTT payload
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawMessage = serde_json::from_slice(payload)?;

        let message = match raw.kind {
            MessageKind::New => LifecycleMessage::New(require(raw.after, raw.kind, "after")?),
            MessageKind::Update => LifecycleMessage::Update(require(raw.after, raw.kind, "after")?),
            // Frigate fills both sections on `end`; fall back to `after` if `before` is absent
            MessageKind::End => LifecycleMessage::End(require(raw.before.or(raw.after), raw.kind, "before")?),
        };

        if message.snapshot().id.is_empty() {
            return Err(DecodeError::MissingId);
        }
        Ok(message)
    }

    /// Lifecycle stage of the message
    pub fn kind(&self) -> MessageKind {
        match self {
            LifecycleMessage::New(_) => MessageKind::New,
            LifecycleMessage::Update(_) => MessageKind::Update,
            LifecycleMessage::End(_) => MessageKind::End,
        }
    }

    /// The event section the message carries
    pub fn snapshot(&self) -> &EventSnapshot {
        match self {
            LifecycleMessage::New(s) | LifecycleMessage::Update(s) | LifecycleMessage::End(s) => s,
        }
    }

    /// Id of the event the message is about
    pub fn event_id(&self) -> &str {
        &self.snapshot().id
    }
}

fn require(
    section: Option<EventSnapshot>,
    kind: MessageKind,
    field: &'static str,
) -> Result<EventSnapshot, DecodeError> {
    section.ok_or(DecodeError::MissingPayload { kind, field })
}

/// Treat an explicit JSON `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Frigate has shipped sub labels as a bare string, a `[name, score]` pair,
/// a list of names and a list of `{"subLabel": ...}` objects.
fn sub_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
    Ok(flatten_sub_labels(&value))
}

fn flatten_sub_labels(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Array(items) => {
            if let [Value::String(name), Value::Number(_)] = items.as_slice() {
                return vec![name.clone()];
            }
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(obj) => obj
                        .get("subLabel")
                        .or_else(|| obj.get("sub_label"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    Value::Array(pair) => pair.first().and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect()
        }
        _ => Vec::new(),
    }
}
