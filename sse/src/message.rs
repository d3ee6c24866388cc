use crate::error::Result;
use axum::response::sse::Event;
use serde::Serialize;
use std::time::Duration;

/// Opaque value pushed to a user's sessions. It is only serialized when an event
/// record is formatted for the wire.
pub type Payload = serde_json::Value;

/// Default reconnect hint sent to clients with every event record.
pub const DEFAULT_RETRY: Duration = Duration::from_millis(15_000);

/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Event record carrying the latest value for a user, serialized as `{"data": <value>}`.
#[derive(Debug, Serialize)]
pub struct CurrentValue<'a, T> {
    pub data: &'a T,
}

impl<T> EventType for CurrentValue<'_, T> {
    fn event_type(&self) -> &'static str {
        "current-value"
    }
}

impl<'a, T: Serialize> CurrentValue<'a, T> {
    pub fn new(data: &'a T) -> Self {
        Self { data }
    }

    /// Format the record as an SSE event: event type, retry hint and a single-line
    /// JSON data field.
    pub fn to_event(&self, retry: Duration) -> Result<Event> {
        // Compact serialization never emits raw newlines
        let data = serde_json::to_string(self)?;

        Ok(Event::default()
            .event(self.event_type())
            .retry(retry)
            .data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Serializer;
    use serde_json::json;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> core::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not serializable"))
        }
    }

    #[test]
    fn current_value_wraps_payload_in_data_field() {
        let value = json!({"message": "Hello world!"});
        let serialized = serde_json::to_string(&CurrentValue::new(&value)).unwrap();
        assert_eq!(serialized, r#"{"data":{"message":"Hello world!"}}"#);
    }

    #[test]
    fn multiline_strings_stay_on_one_line() {
        let value = json!("first\nsecond");
        let serialized = serde_json::to_string(&CurrentValue::new(&value)).unwrap();
        assert!(!serialized.contains('\n'));
    }

    #[test]
    fn event_type_is_current_value() {
        let value = json!(1);
        assert_eq!(CurrentValue::new(&value).event_type(), "current-value");
    }

    #[test]
    fn formatting_failure_is_a_serialization_error() {
        let err = CurrentValue::new(&Unserializable)
            .to_event(DEFAULT_RETRY)
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Serialization);
    }
}
