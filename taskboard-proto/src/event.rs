//! Live update events pushed to connected observers.
//!
//! Events travel as JSON text frames over the `/ws` WebSocket. The server
//! sends [`ServerEvent::Connected`] once after registering an observer, then
//! a [`ServerEvent::TasksUpdated`] hint every time task state changes. The
//! hint carries no payload: clients re-fetch the task list.

use serde::{Deserialize, Serialize};

/// Wire name of the task change hint.
pub const TASKS_UPDATED: &str = "tasksUpdated";

/// Error type for event encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The frame was not a recognised event.
    #[error("event decode error: {0}")]
    Decode(#[source] serde_json::Error),
    /// The event could not be serialized.
    #[error("event encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Events sent from the server to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    /// The observer has been registered and will receive broadcasts.
    Connected {
        /// Registry key assigned to this observer.
        #[serde(rename = "subscriberId")]
        subscriber_id: String,
    },
    /// Task state changed; re-fetch.
    TasksUpdated,
}

/// Encodes a [`ServerEvent`] as a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Encode`] if serialization fails.
pub fn encode(event: &ServerEvent) -> Result<String, EventError> {
    serde_json::to_string(event).map_err(EventError::Encode)
}

/// Decodes a [`ServerEvent`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Decode`] for malformed JSON or unknown event names.
pub fn decode(text: &str) -> Result<ServerEvent, EventError> {
    serde_json::from_str(text).map_err(EventError::Decode)
}
