// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelopes and message rendering
//!
//! An [`Envelope`] is one `(timestamp, payload)` row. Whatever the caller
//! stages is reduced to a string payload before it is stored anywhere.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Fields that make a structured value classifiable as an error record
const ERROR_FIELDS: [&str; 3] = ["name", "message", "stack"];

/// One timestamped log row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub timestamp: String,
    pub payload: String,
}

impl Envelope {
    pub fn new(timestamp: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            payload: payload.into(),
        }
    }
}

// Stored as a two-element array so durable rows keep the two-column shape.
impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.timestamp, &self.payload).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (timestamp, payload) = <(String, String)>::deserialize(deserializer)?;
        Ok(Self { timestamp, payload })
    }
}

/// Something a caller wants to log
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Value(Value),
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Message::Value(value)
    }
}

impl Message {
    /// Build an error record from a Rust error, following its `source()` chain
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Message::Value(error_record(err))
    }

    /// Reduce the message to the payload string stored in an envelope
    pub fn render(self) -> String {
        match self {
            Message::Text(text) => text,
            Message::Value(Value::String(text)) => text,
            Message::Value(value) if is_error_record(&value) => {
                format!("There was an error.\n{}\n", format_error(&value))
            }
            Message::Value(value) => value.to_string(),
        }
    }
}

/// True when `value` carries string `name`, `message` and `stack` fields
pub fn is_error_record(value: &Value) -> bool {
    ERROR_FIELDS
        .iter()
        .all(|field| value.get(field).is_some_and(Value::is_string))
}

fn error_record(err: &(dyn std::error::Error + 'static)) -> Value {
    let message = err.to_string();
    let mut record = Map::new();
    record.insert("name".to_string(), Value::from("Error"));
    record.insert("stack".to_string(), Value::from(format!("Error: {}", message)));
    record.insert("message".to_string(), Value::from(message));
    if let Some(source) = err.source() {
        record.insert("cause".to_string(), error_record(source));
    }
    Value::Object(record)
}

fn format_error(err: &Value) -> String {
    let stack = err
        .get("stack")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let details = err
        .get("details")
        .filter(|details| is_truthy(details))
        .map(|details| format!("Details: {}", details));

    let cause = err
        .get("cause")
        .filter(|cause| is_truthy(cause))
        .map(|cause| {
            if is_error_record(cause) {
                format!("Cause: ERROR\n{}", format_error(cause))
            } else {
                format!("Cause: {}", cause)
            }
        });

    ["\nERROR".to_string(), stack]
        .into_iter()
        .chain(details)
        .chain(cause)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
