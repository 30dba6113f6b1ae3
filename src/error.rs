// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Error types surfaced by the engine

use thiserror::Error;

use crate::events::MessageKind;

/// Failure to turn an inbound payload into a lifecycle message.
///
/// Always recoverable: the offending message is dropped and the consumer
/// keeps running.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload was not valid JSON or did not match the event schema
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Message type requires a payload section that was absent
    #[error("'{kind}' message is missing its '{field}' section")]
    MissingPayload {
        /// Lifecycle type of the message
        kind: MessageKind,
        /// Name of the absent section (`before` / `after`)
        field: &'static str,
    },

    /// Event section carried an empty id
    #[error("event payload has an empty id")]
    MissingId,
}

/// Errors returned by administrative engine queries
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The event id is unknown or has already ended
    #[error("event {0} not found")]
    NotFound(String),

    /// The alert payload for an event could not be serialized
    #[error("could not encode alert for event {id}: {reason}")]
    Encode {
        /// Event the alert was built for
        id: String,
        /// Serializer error message
        reason: String,
    },
}

impl EngineError {
    /// Wrap a payload serialization failure for event `id`
    pub fn encode(id: &str, error: &serde_json::Error) -> Self {
        EngineError::Encode {
            id: id.to_string(),
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_failure_is_not_a_lookup_miss() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = EngineError::encode("e1", &cause);

        assert!(matches!(&error, EngineError::Encode { id, .. } if id == "e1"));
        assert_ne!(error, EngineError::NotFound("e1".into()));
        assert!(error.to_string().starts_with("could not encode alert for event e1"));
    }
}
