//! Filter input
//!
//! `FilterInput` is the loosely-typed key/value mapping a caller hands to a
//! filter: decoded query-string parameters, a JSON object, or pairs built in
//! code. Keys keep their insertion (or document) order, and a key can be
//! present but undefined, in which case dispatch skips it.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::orm::SqlValue;

// =============================================================================
// FilterValue
// =============================================================================

/// A single scalar input value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FilterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, parsing numeric strings from query-string input.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FilterValue::Int(i) => Some(*i),
            FilterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Float(f) => Some(*f),
            FilterValue::Int(i) => Some(*i as f64),
            FilterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean value. Accepts `1`/`0` and `"true"`/`"false"`/`"1"`/`"0"`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FilterValue::Bool(b) => Some(*b),
            FilterValue::Int(0) => Some(false),
            FilterValue::Int(1) => Some(true),
            FilterValue::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }

    /// Convert a JSON scalar. Arrays and objects are rejected.
    pub fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(FilterValue::Null),
            Value::Bool(b) => Ok(FilterValue::Bool(*b)),
            Value::String(s) => Ok(FilterValue::String(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(FilterValue::Int(i)),
                None => n.as_f64().map(FilterValue::Float).ok_or_else(|| Error::InvalidInput {
                    key: key.to_string(),
                    reason: format!("number {} is out of range", n),
                }),
            },
            Value::Array(_) | Value::Object(_) => Err(Error::InvalidInput {
                key: key.to_string(),
                reason: "expected a scalar value".to_string(),
            }),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => f.write_str(s),
            FilterValue::Int(i) => write!(f, "{}", i),
            FilterValue::Float(x) => write!(f, "{}", x),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<&FilterValue> for SqlValue {
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::String(s) => SqlValue::String(s.clone()),
            FilterValue::Int(i) => SqlValue::Int(*i),
            FilterValue::Float(f) => SqlValue::Float(*f),
            FilterValue::Bool(b) => SqlValue::Bool(*b),
            FilterValue::Null => SqlValue::Null,
        }
    }
}

impl From<FilterValue> for SqlValue {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::String(s) => SqlValue::String(s),
            other => SqlValue::from(&other),
        }
    }
}

impl<'de> Deserialize<'de> for FilterValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FilterValueVisitor)
    }
}

struct FilterValueVisitor;

impl<'de> Visitor<'de> for FilterValueVisitor {
    type Value = FilterValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean or null")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(FilterValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(FilterValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        match i64::try_from(v) {
            Ok(i) => Ok(FilterValue::Int(i)),
            Err(_) => Ok(FilterValue::Float(v as f64)),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(FilterValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(FilterValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(FilterValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(FilterValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(FilterValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

// =============================================================================
// FilterInput
// =============================================================================

/// Ordered filter input.
///
/// ```rust,ignore
/// let input = FilterInput::new()
///     .with("username", "adon")
///     .with("isAdmin", false)
///     .unset("email");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterInput {
    entries: Vec<(String, Option<FilterValue>)>,
}

impl FilterInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a defined value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    /// Add a key without a value; dispatch skips it
    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.insert(key, None);
        self
    }

    /// Insert a value, keeping the position of an existing key.
    ///
    /// Returns the previous entry if the key was already present.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: Option<FilterValue>,
    ) -> Option<Option<FilterValue>> {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// The defined value for `key`, if any
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Whether `key` is present, defined or not
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order, undefined values as `None`
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FilterValue>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    /// Build from a JSON object, in document order
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| Error::InvalidInput {
            key: String::new(),
            reason: "expected a JSON object".to_string(),
        })?;

        let mut input = Self::new();
        for (key, value) in object {
            input.insert(key.as_str(), Some(FilterValue::from_json(key, value)?));
        }
        Ok(input)
    }

    /// Build from a URL query string (`a=1&b=two`); every value is a string.
    /// A repeated key keeps its first position and its last value.
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut input = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            input.insert(key, Some(FilterValue::String(value.into_owned())));
        }
        input
    }
}

impl<K, V> FromIterator<(K, V)> for FilterInput
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut input = Self::new();
        input.extend(iter);
        input
    }
}

impl<K, V> Extend<(K, V)> for FilterInput
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, Some(value.into()));
        }
    }
}

impl Serialize for FilterInput {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let defined: Vec<_> = self
            .iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect();

        let mut map = serializer.serialize_map(Some(defined.len()))?;
        for (key, value) in defined {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterInput {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(FilterInputVisitor)
    }
}

struct FilterInputVisitor;

impl<'de> Visitor<'de> for FilterInputVisitor {
    type Value = FilterInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of filter keys to scalar values")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut input = FilterInput::new();
        while let Some((key, value)) = access.next_entry::<String, FilterValue>()? {
            input.insert(key, Some(value));
        }
        Ok(input)
    }
}
