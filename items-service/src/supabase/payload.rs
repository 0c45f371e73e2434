//! Schema-agnostic row payloads for inserts and updates.

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{DataError, DataResult};

/// Ordered field map sent as a JSON object.
///
/// A field that was never set is not sent at all; a field set to
/// [`Value::Null`] is sent as `null`. Partial updates depend on the
/// difference.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field`, replacing any earlier value but keeping its position.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Sets `field` only when `value` is `Some`, leaving it absent otherwise.
    #[must_use]
    pub fn set_opt<V: Into<Value>>(self, field: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(field, v),
            None => self,
        }
    }

    /// Explicitly clears `field` on the remote row.
    #[must_use]
    pub fn set_null(self, field: impl Into<String>) -> Self {
        self.set(field, Value::Null)
    }

    /// Builds a payload from any serialisable struct or map. Non-object
    /// values are rejected.
    pub fn from_serializable<T: Serialize>(value: &T) -> DataResult<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DataError::invalid(format!(
                "payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_fields_differ() {
        let payload = Payload::new()
            .set("title", "Buy milk")
            .set_opt::<String>("description", None)
            .set_null("due_at");

        assert_eq!(
            payload.clone().into_value(),
            json!({ "title": "Buy milk", "due_at": null })
        );
        assert!(!payload.contains("description"));
        assert!(payload.contains("due_at"));
    }

    #[test]
    fn preserves_insertion_order() {
        let payload = Payload::new()
            .set("z", 1)
            .set("a", true)
            .set("m", json!({ "nested": [1, 2] }));

        let fields: Vec<&str> = payload.fields().collect();
        assert_eq!(fields, vec!["z", "a", "m"]);
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"z":1,"a":true,"m":{"nested":[1,2]}}"#
        );
    }

    #[test]
    fn rejects_non_object_sources() {
        let err = Payload::from_serializable(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, DataError::InvalidInput(_)));
    }

    #[test]
    fn builds_from_struct() {
        #[derive(Serialize)]
        struct Patch {
            completed: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            title: Option<String>,
        }

        let payload = Payload::from_serializable(&Patch {
            completed: true,
            title: None,
        })
        .unwrap();
        assert_eq!(payload.into_value(), json!({ "completed": true }));
    }
}
