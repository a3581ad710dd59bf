use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    document::{Document, read_i64, read_truthy},
    plan::Plan,
};

/// A single plan permission value, decoded once when read from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PermissionValue {
    /// Decode a stored value. Stringified booleans and integers are unwrapped;
    /// arrays, objects and nulls are not permission values.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(PermissionValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(PermissionValue::Integer(i)),
                None => n.as_f64().map(PermissionValue::Float),
            },
            Value::String(s) => {
                let trimmed = s.trim();
                match trimmed.to_lowercase().as_str() {
                    "true" => Some(PermissionValue::Bool(true)),
                    "false" => Some(PermissionValue::Bool(false)),
                    _ => Some(
                        trimmed
                            .parse::<i64>()
                            .map(PermissionValue::Integer)
                            .unwrap_or_else(|_| PermissionValue::Text(s.clone())),
                    ),
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PermissionValue::Bool(b) => Value::Bool(*b),
            PermissionValue::Integer(i) => Value::from(*i),
            PermissionValue::Float(f) => Value::from(*f),
            PermissionValue::Text(s) => Value::from(s.clone()),
        }
    }
}

pub type PermissionMap = BTreeMap<String, PermissionValue>;

/// Decoded permissions plus the keys whose values were rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPermissions {
    pub values: PermissionMap,
    pub rejected: Vec<String>,
}

pub fn decode_permissions(raw: &Document) -> DecodedPermissions {
    let mut decoded = DecodedPermissions::default();
    for (key, value) in raw {
        match PermissionValue::from_json(value) {
            Some(v) => {
                decoded.values.insert(key.clone(), v);
            }
            None => decoded.rejected.push(key.clone()),
        }
    }
    decoded
}

pub fn encode_permissions(values: &PermissionMap) -> Document {
    values
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Interstitial ad settings for one device platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdsConfig {
    pub enabled: bool,
    pub min_interval_sec: i64,
    pub min_view_sec: i64,
    pub show_on: Vec<String>,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_interval_sec: 3600,
            min_view_sec: 5,
            show_on: vec!["home".to_string()],
        }
    }
}

impl AdsConfig {
    /// Decode a stored config. Missing keys take values from `fallback`;
    /// returns `None` if no recognized key is present.
    pub fn from_document(raw: &Document, fallback: &AdsConfig) -> Option<Self> {
        const KEYS: [&str; 4] = ["enabled", "min_interval_sec", "min_view_sec", "show_on"];
        if !KEYS.iter().any(|k| raw.contains_key(*k)) {
            return None;
        }

        let seconds = |key: &str, default: i64| {
            if raw.contains_key(key) {
                read_i64(raw, key).value().unwrap_or(0).max(0)
            } else {
                default
            }
        };

        let show_on = match raw.get("show_on") {
            None => fallback.show_on.clone(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|item| !item.is_empty())
                .collect(),
            Some(_) => Vec::new(),
        };

        Some(Self {
            enabled: if raw.contains_key("enabled") {
                read_truthy(raw, "enabled")
            } else {
                fallback.enabled
            },
            min_interval_sec: seconds("min_interval_sec", fallback.min_interval_sec),
            min_view_sec: seconds("min_view_sec", fallback.min_view_sec),
            show_on,
        })
    }

    /// Ads are only shown on the free access plan.
    pub fn gated_for(mut self, access_plan: Plan) -> Self {
        if access_plan != Plan::Free {
            self.enabled = false;
        }
        self
    }
}
