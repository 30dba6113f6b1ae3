// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Frigate Alerts - event correlation and alerting for Frigate NVR
//!
//! Consumes Frigate's `new` / `update` / `end` event stream from MQTT and
//! publishes filtered, de-duplicated alerts back to the broker:
//! - Minimum-duration deferral with cancellable per-event timers
//! - Significance filtering of event updates
//! - Per-camera label allow-lists and required / ignored zone rules
//! - Snapshot / clip requirements and stale-event cut-off
//! - Per-camera and per-label cooldown windows
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MQTT broker                           │
//! └──────────────┬───────────────────────────────▲───────────────┘
//!                │ frigate/events                 │ <alert_topic>/alert
//!          ┌─────▼─────┐                    ┌─────┴──────┐
//!          │ MqttBridge│                    │ Publisher  │
//!          └─────┬─────┘                    └─────▲──────┘
//!                │                                │
//!  ┌─────────────▼────────────────────────────────┴───────────┐
//!  │                         Engine                            │
//!  │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐   │
//!  │  │ Event table │  │ Deferred     │→ │ Eligibility     │   │
//!  │  │             │  │ queue/timers │  │ (zones,cooldown)│   │
//!  │  └─────────────┘  └──────────────┘  └─────────────────┘   │
//!  └──────────────────────────┬────────────────────────────────┘
//!                             ↓
//!                   ┌─────────────────────┐
//!                   │ Event bus (observe) │
//!                   └─────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod events;
pub mod logging;
pub mod streaming;

// Re-exports for convenience
pub use crate::config::{Config, Settings};
pub use crate::core::{Engine, EventBus};
pub use crate::detection::{CooldownTracker, Rejection};
pub use crate::error::{DecodeError, EngineError};
pub use crate::events::{EventSnapshot, LifecycleMessage, MessageKind};
pub use crate::streaming::{MqttBridge, Notification, Publisher};

/// Frigate Alerts version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Frigate Alerts name
pub const NAME: &str = "Frigate Alerts";
