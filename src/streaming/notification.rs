// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Alert payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::EventSnapshot;

/// Payload published to `<alert_topic>/alert`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Frigate event id
    pub id: String,
    /// Grouping key so clients can collapse alerts per camera
    pub group: String,
    /// Human readable summary
    pub message: String,
    /// Detection score
    pub score: f64,
    /// Object label
    pub label: String,
    /// Recognised sub labels
    pub sub_label: Vec<String>,
    /// Camera name
    pub camera: String,
    /// Zones the object is currently in
    pub zones: Vec<String>,
    /// Thumbnail URL, when a snapshot exists
    pub image: Option<String>,
    /// Clip URL, when a clip exists
    pub video: Option<String>,
    /// When the alert was emitted
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Build the alert for an eligible event
    pub fn for_event(event: &EventSnapshot, api_base_url: &str, timestamp: DateTime<Utc>) -> Self {
        let base = api_base_url.trim_end_matches('/');

        Self {
            id: event.id.clone(),
            group: format!("frigate-{}", event.camera.replace('_', "-")),
            message: format!(
                "{} was detected on {}",
                detection_string(event),
                location_string(event)
            ),
            score: event.score,
            label: event.label.clone(),
            sub_label: event.sub_labels.clone(),
            camera: event.camera.clone(),
            zones: event.current_zones.iter().cloned().collect(),
            image: event
                .has_snapshot
                .then(|| format!("{}/events/{}/thumbnail.jpg", base, event.id)),
            video: event
                .has_clip
                .then(|| format!("{}/events/{}/clip.mp4", base, event.id)),
            timestamp,
        }
    }

    /// Serialize to the JSON published on the alert topic
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// "Person", or "Person (Alice, Bob)" when sub labels are known
pub fn detection_string(event: &EventSnapshot) -> String {
    let label = normalize(&event.label);
    if event.sub_labels.is_empty() {
        label
    } else {
        let subs: Vec<String> = event.sub_labels.iter().map(|s| normalize(s)).collect();
        format!("{} ({})", label, subs.join(", "))
    }
}

/// Zones the event is in, falling back to the camera name
pub fn location_string(event: &EventSnapshot) -> String {
    if event.current_zones.is_empty() {
        normalize(&event.camera)
    } else {
        event
            .current_zones
            .iter()
            .map(|z| normalize(z))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `front_door` -> `Front Door`
pub fn normalize(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
