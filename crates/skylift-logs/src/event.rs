//! Wire format for build log events.

use serde::{Deserialize, Serialize};

/// A single build-progress message.
///
/// Serialized as `{"log": "<text>"}` — the payload subscribers receive
/// on the `logs:{project_id}` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub log: String,
}

impl LogEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self { log: message.into() }
    }

    /// Serialize to the wire payload. Infallible for a string field.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"log\":\"\"}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape() {
        let event = LogEvent::new("Build Started...");
        assert_eq!(event.to_payload(), r#"{"log":"Build Started..."}"#);
    }

    #[test]
    fn round_trips() {
        let event = LogEvent::new("uploaded index.html");
        let parsed: LogEvent = serde_json::from_str(&event.to_payload()).unwrap();
        assert_eq!(parsed, event);
    }
}
