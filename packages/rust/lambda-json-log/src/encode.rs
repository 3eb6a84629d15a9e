//! JSON encoding of log lines and field values.
//!
//! Nothing in here returns an error: values that cannot be represented as
//! JSON degrade to a textual rendering so a log call never fails.

use crate::constants::keys;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;
use tracing::Level;

/// Serialize a value to a JSON string.
///
/// Falls back to the value's `Debug` representation when serialization
/// fails, for instance for maps with non-string keys.
///
/// # Example
///
/// ```
/// use lambda_json_log::to_json_string;
/// use std::collections::HashMap;
///
/// assert_eq!(to_json_string(&vec![1, 2]), "[1,2]");
///
/// let tuple_keys = HashMap::from([((1, 2), "x")]);
/// assert_eq!(to_json_string(&tuple_keys), r#"{(1, 2): "x"}"#);
/// ```
pub fn to_json_string<T>(value: &T) -> String
where
    T: Serialize + Debug + ?Sized,
{
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

/// Convert a value to a JSON field value, never failing.
pub fn to_value<T>(value: &T) -> Value
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(value)
        .unwrap_or_else(|err| Value::String(format!("<unserializable: {}>", err)))
}

/// One log line before encoding.
pub(crate) struct Record<'a> {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub name: Option<&'a str>,
    pub caller: Option<String>,
    pub message: &'a str,
    pub stacktrace: Option<String>,
    pub context: &'a [(String, Value)],
    pub fields: Vec<(String, Value)>,
}

impl Record<'_> {
    /// Encode as one JSON object terminated by a newline.
    ///
    /// Keys keep insertion order. When a key repeats, the later value wins
    /// and the key stays where it first appeared.
    pub(crate) fn encode(self) -> String {
        let mut object = Map::new();
        object.insert(keys::TIME.into(), Value::String(format_time(&self.time)));
        object.insert(keys::LEVEL.into(), Value::String(self.level.as_str().into()));
        if let Some(name) = self.name {
            object.insert(keys::LOGGER.into(), Value::String(name.into()));
        }
        if let Some(caller) = self.caller {
            object.insert(keys::CALLER.into(), Value::String(caller));
        }
        object.insert(keys::MESSAGE.into(), Value::String(self.message.into()));
        if let Some(stacktrace) = self.stacktrace {
            object.insert(keys::STACKTRACE.into(), Value::String(stacktrace));
        }

        for (key, value) in self.context {
            object.insert(key.clone(), value.clone());
        }
        for (key, value) in self.fields {
            object.insert(key, value);
        }

        let mut line = Value::Object(object).to_string();
        line.push('\n');
        line
    }
}

/// ISO-8601 with millisecond precision, e.g. `2024-05-01T12:30:00.123Z`.
pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Shorten a source path to its last directory and file name.
pub(crate) fn short_caller(file: &str, line: u32) -> String {
    let mut parts = file.rsplitn(3, ['/', '\\']);
    let file_name = parts.next().unwrap_or(file);
    match parts.next() {
        Some(dir) if !dir.is_empty() => format!("{}/{}:{}", dir, file_name, line),
        _ => format!("{}:{}", file_name, line),
    }
}
