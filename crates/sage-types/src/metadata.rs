//! Open metadata mapping for `AgentMessage`
//!
//! The metadata channel is extensible: recognized keys are enumerated per
//! domain (see `sage-types::slots`), everything else rides through this
//! tagged-variant scheme unexamined.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single metadata value. Nests one level deep, matching the shapes that
/// actually appear on the wire (string, number, bool, a flat map, a list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Str(String),
    Num(f64),
    Bool(bool),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Num(n) => Some(*n),
            MetadataValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Lossless conversion into a generic JSON value, the escape hatch for
    /// forward compatibility the design notes ask for.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Str(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Str(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Num(n as f64)
    }
}

impl From<u64> for MetadataValue {
    fn from(n: u64) -> Self {
        MetadataValue::Num(n as f64)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Num(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// The open string-to-value mapping carried by `AgentMessage`.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Insert a value into a metadata map, dropping empty strings (the slot
/// merge rule treats an empty string as "absent").
pub fn metadata_insert(map: &mut Metadata, key: impl Into<String>, value: impl Into<MetadataValue>) {
    let value = value.into();
    if let MetadataValue::Str(s) = &value {
        if s.is_empty() {
            return;
        }
    }
    map.insert(key.into(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let mut map: Metadata = BTreeMap::new();
        map.insert("amount".into(), MetadataValue::Num(2_000_000.0));
        map.insert("method".into(), MetadataValue::Str("toss".into()));

        let json = serde_json::to_string(&map).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }

    #[test]
    fn empty_string_is_not_inserted() {
        let mut map: Metadata = BTreeMap::new();
        metadata_insert(&mut map, "note", "");
        assert!(map.is_empty());
    }
}
