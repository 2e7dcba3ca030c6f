//! Declarative state values
//!
//! Handles encoding and decoding of resource state, and the prior/planned
//! view handlers use to compute which attributes changed.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Dynamic value exchanged with the configuration engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<DynamicValue>),
    Map(BTreeMap<String, DynamicValue>),
}

static NULL: DynamicValue = DynamicValue::Null;

impl DynamicValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DynamicValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, DynamicValue>> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_map()?.get(key)
    }

    /// Attribute value, `Null` when absent
    pub fn attr(&self, key: &str) -> &DynamicValue {
        self.get(key).unwrap_or(&NULL)
    }

    /// Set an attribute, turning a null value into an empty map first
    pub fn set(&mut self, key: &str, value: DynamicValue) {
        if self.is_null() {
            *self = DynamicValue::Map(BTreeMap::new());
        }
        if let DynamicValue::Map(m) = self {
            m.insert(key.to_string(), value);
        }
    }

    /// Copy of this value with every list sorted, for set comparison
    pub fn as_set(&self) -> DynamicValue {
        match self {
            DynamicValue::List(items) => {
                let mut items: Vec<_> = items.iter().map(DynamicValue::as_set).collect();
                items.sort_by_key(|v| serde_json::to_string(v).unwrap_or_default());
                DynamicValue::List(items)
            }
            DynamicValue::Map(m) => DynamicValue::Map(
                m.iter().map(|(k, v)| (k.clone(), v.as_set())).collect(),
            ),
            other => other.clone(),
        }
    }

    /// Empty lists and nulls both mean "not configured"
    pub fn is_empty(&self) -> bool {
        match self {
            DynamicValue::Null => true,
            DynamicValue::List(l) => l.is_empty(),
            _ => false,
        }
    }
}

impl Default for DynamicValue {
    fn default() -> Self {
        DynamicValue::Null
    }
}

/// Decode state bytes produced by [`encode_dynamic_value`]
pub fn decode_dynamic_value(data: &[u8]) -> Result<DynamicValue> {
    if data.is_empty() {
        return Ok(DynamicValue::Null);
    }
    Ok(serde_json::from_slice(data)?)
}

pub fn encode_dynamic_value(value: &DynamicValue) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Helper to extract a string attribute from a DynamicValue
pub fn get_string_attr(value: &DynamicValue, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_string())
        .unwrap_or("")
        .to_string()
}

/// Helper to extract an optional, non-empty string attribute
pub fn get_optional_string_attr(value: &DynamicValue, key: &str) -> Option<String> {
    value.get(key).and_then(|v| match v {
        DynamicValue::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

pub fn get_int_attr(value: &DynamicValue, key: &str, default: i64) -> i64 {
    value.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
}

pub fn get_optional_int_attr(value: &DynamicValue, key: &str) -> Option<i64> {
    value.get(key).and_then(|v| v.as_i64())
}

pub fn get_bool_attr(value: &DynamicValue, key: &str, default: bool) -> bool {
    value.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

pub fn get_optional_bool_attr(value: &DynamicValue, key: &str) -> Option<bool> {
    value.get(key).and_then(|v| v.as_bool())
}

/// Helper to extract a list (or set) of strings
pub fn get_string_list_attr(value: &DynamicValue, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_list())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_string().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Nested blocks are stored as lists of maps
pub fn get_blocks<'a>(value: &'a DynamicValue, key: &str) -> Vec<&'a DynamicValue> {
    value
        .get(key)
        .and_then(|v| v.as_list())
        .map(|items| items.iter().filter(|v| v.as_map().is_some()).collect())
        .unwrap_or_default()
}

/// First element of a single-item nested block
pub fn get_block<'a>(value: &'a DynamicValue, key: &str) -> Option<&'a DynamicValue> {
    get_blocks(value, key).into_iter().next()
}

/// Create a DynamicValue map with the given attributes
pub fn make_state(attrs: Vec<(&str, DynamicValue)>) -> DynamicValue {
    DynamicValue::Map(
        attrs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

pub fn string_value(s: impl Into<String>) -> DynamicValue {
    DynamicValue::String(s.into())
}

pub fn optional_string_value(s: Option<&str>) -> DynamicValue {
    s.map(string_value).unwrap_or(DynamicValue::Null)
}

pub fn int_value(n: i64) -> DynamicValue {
    DynamicValue::Number(serde_json::Number::from(n))
}

pub fn bool_value(b: bool) -> DynamicValue {
    DynamicValue::Bool(b)
}

pub fn list_value(items: Vec<DynamicValue>) -> DynamicValue {
    DynamicValue::List(items)
}

/// String set, stored sorted
pub fn string_set_value<S: AsRef<str>>(items: &[S]) -> DynamicValue {
    let mut items: Vec<String> = items.iter().map(|s| s.as_ref().to_string()).collect();
    items.sort();
    items.dedup();
    DynamicValue::List(items.into_iter().map(DynamicValue::String).collect())
}

/// Prior and planned state of one resource during an apply
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    prior: DynamicValue,
    planned: DynamicValue,
}

impl ResourceData {
    pub fn new(prior: DynamicValue, planned: DynamicValue) -> Self {
        Self { prior, planned }
    }

    /// Resource identifier, taken from the prior state
    pub fn id(&self) -> String {
        let id = get_string_attr(&self.prior, "id");
        if id.is_empty() {
            get_string_attr(&self.planned, "id")
        } else {
            id
        }
    }

    pub fn prior(&self) -> &DynamicValue {
        &self.prior
    }

    pub fn planned(&self) -> &DynamicValue {
        &self.planned
    }

    pub fn get(&self, key: &str) -> &DynamicValue {
        self.planned.attr(key)
    }

    pub fn get_change(&self, key: &str) -> (&DynamicValue, &DynamicValue) {
        (self.prior.attr(key), self.planned.attr(key))
    }

    /// Integer change, treating absent values as 0
    pub fn get_int_change(&self, key: &str) -> (i64, i64) {
        (
            get_int_attr(&self.prior, key, 0),
            get_int_attr(&self.planned, key, 0),
        )
    }

    pub fn has_change(&self, key: &str) -> bool {
        let (old, new) = self.get_change(key);
        old != new && !(old.is_empty() && new.is_empty())
    }

    /// Like [`has_change`](Self::has_change), ignoring element order
    pub fn has_set_change(&self, key: &str) -> bool {
        let (old, new) = self.get_change(key);
        old.as_set() != new.as_set() && !(old.is_empty() && new.is_empty())
    }
}
