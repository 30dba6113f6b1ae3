// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Streaming module - MQTT transport, alert payloads, recording and replay

mod mqtt;
mod notification;
mod recorder;
mod replay;

pub use mqtt::*;
pub use notification::*;
pub use recorder::*;
pub use replay::*;

use tracing::info;

/// Outbound side of the transport.
///
/// Publishing is fire-and-forget: implementations must not block and report
/// their own failures. Delivery is at most once.
pub trait Publisher: Send + Sync {
    /// Send `payload` to `topic`
    fn publish(&self, topic: &str, payload: Vec<u8>);
}

/// Writes alerts to the log instead of a broker
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) {
        info!("ALERT {}: {}", topic, String::from_utf8_lossy(&payload));
    }
}
