use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::time::parse_instant;

/// A stored document: a flat JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Outcome of reading a single field from a stored document.
///
/// `Malformed` means a value was present but had the wrong shape. Callers treat
/// it as absent and schedule a rewrite.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRead<T> {
    Absent,
    Present(T),
    Malformed,
}

impl<T> FieldRead<T> {
    pub fn value(self) -> Option<T> {
        match self {
            FieldRead::Present(v) => Some(v),
            FieldRead::Absent | FieldRead::Malformed => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, FieldRead::Malformed)
    }
}

/// Read a non-empty string. Blank strings read as absent.
pub fn read_str(doc: &Document, key: &str) -> FieldRead<String> {
    match doc.get(key) {
        None | Some(Value::Null) => FieldRead::Absent,
        Some(Value::String(s)) if s.trim().is_empty() => FieldRead::Absent,
        Some(Value::String(s)) => FieldRead::Present(s.clone()),
        Some(_) => FieldRead::Malformed,
    }
}

/// Read an RFC 3339 instant stored as a string.
pub fn read_instant(doc: &Document, key: &str) -> FieldRead<DateTime<Utc>> {
    match read_str(doc, key) {
        FieldRead::Present(s) => match parse_instant(&s) {
            Some(dt) => FieldRead::Present(dt),
            None => FieldRead::Malformed,
        },
        FieldRead::Absent => FieldRead::Absent,
        FieldRead::Malformed => FieldRead::Malformed,
    }
}

/// Truthiness for flags written by older clients: booleans, non-zero numbers,
/// and the strings "true", "1" and "yes" are true.
pub fn read_truthy(doc: &Document, key: &str) -> bool {
    match doc.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Read an integer, accepting integral floats and numeric strings.
pub fn read_i64(doc: &Document, key: &str) -> FieldRead<i64> {
    match doc.get(key) {
        None | Some(Value::Null) => FieldRead::Absent,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => FieldRead::Present(v),
            None => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map(|v| FieldRead::Present(v.trunc() as i64))
                .unwrap_or(FieldRead::Malformed),
        },
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(FieldRead::Present)
            .unwrap_or(FieldRead::Malformed),
        Some(_) => FieldRead::Malformed,
    }
}
