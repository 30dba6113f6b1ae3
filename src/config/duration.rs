// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Human-readable durations ("45s", "5m", "1h30m") for configuration files

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

/// Why a duration string was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    /// Nothing but whitespace
    #[error("empty duration")]
    Empty,
    /// Not a sequence of `<number><unit>` groups
    #[error("invalid duration format: {0:?} (expected e.g. \"30s\", \"5m\", \"1h\")")]
    Format(String),
    /// A group used a unit other than `s`, `m` or `h`
    #[error("unsupported time unit {unit:?} in {input:?}")]
    Unit {
        /// The full input
        input: String,
        /// The offending unit
        unit: char,
    },
}

/// Parse a duration made of `<number><unit>` groups, units `s`, `m`, `h`.
/// A bare integer is taken as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if digits.is_empty() {
            return Err(DurationError::Format(input.to_string()));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| DurationError::Format(input.to_string()))?;
        let scale = match ch {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            unit => {
                return Err(DurationError::Unit {
                    input: input.to_string(),
                    unit,
                })
            }
        };
        total = value
            .checked_mul(scale)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| DurationError::Format(input.to_string()))?;
        digits.clear();
    }
    if !digits.is_empty() {
        // trailing number without a unit, e.g. "1m30"
        return Err(DurationError::Format(input.to_string()));
    }

    Ok(Duration::from_secs(total))
}

/// Render a duration the way `parse_duration` reads it back
pub fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// serde adapter: `#[serde(with = "duration")]`
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(duration))
}

/// Serde adapter: accepts a duration string or integer seconds
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
