use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ProvId;

/// Value of a property. Properties are append-only and may repeat a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON rendering used by document export
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Boolean(b) => serde_json::Value::Bool(*b),
            PropertyValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(n.to_string())),
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Number(n as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// A namespaced key/value annotation on an object, relation or bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub owner: ProvId,
    pub prefix: String,
    pub key: String,
    pub value: PropertyValue,
}

impl Property {
    /// `prefix:key`
    pub fn qualified_key(&self) -> String {
        format!("{}:{}", self.prefix, self.key)
    }
}

/// Split `prefix:key` at the first colon. Keys without a prefix fall back to `default_prefix`.
pub fn split_qualified<'a>(qualified: &'a str, default_prefix: &'a str) -> (&'a str, &'a str) {
    match qualified.split_once(':') {
        Some((prefix, key)) if !prefix.is_empty() => (prefix, key),
        _ => (default_prefix, qualified),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("prov:type", "cpl"), ("prov", "type"));
        assert_eq!(split_qualified("size", "cpl"), ("cpl", "size"));
        assert_eq!(split_qualified("ex:a:b", "cpl"), ("ex", "a:b"));
    }

    #[test]
    fn test_untagged_values() {
        let v: PropertyValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, PropertyValue::Boolean(true));
        let v: PropertyValue = serde_json::from_str("4.5").unwrap();
        assert_eq!(v, PropertyValue::Number(4.5));
        let v: PropertyValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(v.as_str(), Some("x"));
        assert_eq!(PropertyValue::from(3i64).to_json(), serde_json::json!(3.0));
    }
}
