// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Recording of inbound event messages and reading them back for replay

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Topic assigned to recordings that hold bare messages
pub const REPLAY_TOPIC: &str = "replay";

/// One line of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedMessage {
    /// Arrival time, absent for bare messages
    pub received_at: Option<DateTime<Utc>>,
    /// Topic the message arrived on
    pub topic: String,
    /// The message as JSON, or as a string if it was not valid JSON
    pub payload: Value,
}

impl RecordedMessage {
    /// Bytes to feed back into the engine
    pub fn payload_bytes(&self) -> Vec<u8> {
        match &self.payload {
            Value::String(raw) => raw.clone().into_bytes(),
            other => serde_json::to_vec(other).unwrap_or_default(),
        }
    }

    /// When the message arrived, in epoch seconds.
    ///
    /// Falls back to the latest `end_time` / `start_time` carried in the
    /// event sections for recordings of bare messages.
    pub fn timestamp(&self) -> Option<f64> {
        if let Some(at) = self.received_at {
            return Some(at.timestamp_millis() as f64 / 1000.0);
        }
        ["after", "before"]
            .iter()
            .filter_map(|section| self.payload.get(*section))
            .flat_map(|event| {
                ["end_time", "start_time"]
                    .into_iter()
                    .filter_map(move |field| event.get(field).and_then(Value::as_f64))
            })
            .reduce(f64::max)
    }
}

/// Appends inbound messages to a JSON-lines file
pub struct MessageRecorder {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    count: Mutex<usize>,
}

impl MessageRecorder {
    /// Open `path` for appending, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening recording {:?}", path))?;
        info!("Recording inbound messages to {:?}", path);

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            count: Mutex::new(0),
        })
    }

    /// Append one message
    pub fn record(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let payload = serde_json::from_slice(payload)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()));
        let line = serde_json::to_string(&RecordedMessage {
            received_at: Some(Utc::now()),
            topic: topic.to_string(),
            payload,
        })?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;

        *self.count.lock() += 1;
        Ok(())
    }

    /// Messages recorded since opening
    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// File being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a recording.
///
/// Lines may be recorder output or bare Frigate messages; blank and
/// unparseable lines are skipped with a warning.
pub fn read_recording(path: &Path) -> Result<Vec<RecordedMessage>> {
    let file = File::open(path).with_context(|| format!("opening recording {:?}", path))?;
    let mut messages = Vec::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping line {} of {:?}: {}", index + 1, path, e);
                continue;
            }
        };

        let wrapped = value.get("topic").is_some() && value.get("payload").is_some();
        let message = if wrapped {
            match serde_json::from_value(value) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Skipping line {} of {:?}: {}", index + 1, path, e);
                    continue;
                }
            }
        } else {
            RecordedMessage {
                received_at: None,
                topic: REPLAY_TOPIC.to_string(),
                payload: value,
            }
        };
        messages.push(message);
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let recorder = MessageRecorder::open(&path).unwrap();
        recorder
            .record("frigate/events", br#"{"type":"new","after":{"id":"a"}}"#)
            .unwrap();
        recorder.record("frigate/events", b"garbage").unwrap();
        assert_eq!(recorder.count(), 2);

        let messages = read_recording(&path).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].topic, "frigate/events");
        assert!(messages[0].received_at.is_some());
        assert_eq!(messages[0].payload["after"]["id"], "a");
        assert_eq!(messages[1].payload_bytes(), b"garbage".to_vec());
    }

    #[test]
    fn test_read_bare_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.jsonl");
        std::fs::write(
            &path,
            "{\"type\":\"new\",\"after\":{\"id\":\"x\"}}\n\nnot json\n{\"type\":\"end\",\"before\":{\"id\":\"x\"}}\n",
        )
        .unwrap();

        let messages = read_recording(&path).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.topic == REPLAY_TOPIC));
        assert_eq!(messages[1].payload["type"], "end");
    }
}
