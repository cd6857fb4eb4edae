//! Log record model.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Severity of a structured record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Normal lifecycle and access events.
    Info,
    /// Degradation or injected resource pressure.
    Warn,
    /// Failures, real or synthetic.
    Error,
}

impl LogLevel {
    /// Returns the wire name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open-ended key/value context attached to a record.
///
/// Values are converted to JSON eagerly. A value that cannot be serialized
/// is replaced by a placeholder string so the record is still emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any previous value under the same key.
    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)));
        self.0.insert(key.to_owned(), value);
        self
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of fields.
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

/// A single write-once log record.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// UTC timestamp, RFC 3339 with millisecond precision.
    pub timestamp: String,
    /// Additional context.
    pub fields: Fields,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    pub fn now(level: LogLevel, message: impl Into<String>, fields: Fields) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            fields,
        }
    }

    /// Renders the record as a single JSON line without a trailing newline.
    ///
    /// `level`, `message` and `timestamp` always win over fields of the same name.
    pub fn to_line(&self) -> String {
        let mut object = Map::with_capacity(self.fields.len() + 3);
        object.insert("level".into(), Value::String(self.level.as_str().into()));
        object.insert("message".into(), Value::String(self.message.clone()));
        object.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        for (key, value) in &self.fields.0 {
            object.entry(key.clone()).or_insert_with(|| value.clone());
        }

        serde_json::to_string(&Value::Object(object)).unwrap_or_else(|_| {
            format!(
                "{{\"level\":\"{}\",\"message\":{:?},\"timestamp\":\"{}\"}}",
                self.level, self.message, self.timestamp
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_line_contains_core_keys() {
        let record = LogRecord::now(LogLevel::Warn, "Memory leak triggered", Fields::new());
        let parsed: Value = serde_json::from_str(&record.to_line()).unwrap();

        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["message"], "Memory leak triggered");
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_fields_are_flattened() {
        let fields = Fields::new().with("clearedItems", &42u64).with("path", "/x");
        let record = LogRecord::now(LogLevel::Info, "Memory cleared", fields);
        let parsed: Value = serde_json::from_str(&record.to_line()).unwrap();

        assert_eq!(parsed["clearedItems"], 42);
        assert_eq!(parsed["path"], "/x");
    }

    #[test]
    fn test_fields_cannot_shadow_core_keys() {
        let fields = Fields::new().with("level", "DEBUG");
        let record = LogRecord::now(LogLevel::Error, "boom", fields);
        let parsed: Value = serde_json::from_str(&record.to_line()).unwrap();

        assert_eq!(parsed["level"], "ERROR");
    }

    #[test]
    fn test_unserializable_field_degrades() {
        // JSON object keys must be strings.
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1u8);
        let fields = Fields::new().with("bad", &bad);

        let value = fields.get("bad").unwrap().as_str().unwrap();
        assert!(value.starts_with("<unserializable"));
    }
}
