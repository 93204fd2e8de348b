//! Structured value model
//!
//! [`StructuredValue`] is a closed sum type. Anything the caller does not want
//! traversed (framework instances, binary handles) goes in as
//! [`StructuredValue::Opaque`] and is carried through untouched.

use crate::error::KeycaseError;
use ahash::AHashMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A recursively-defined value: scalar, list, mapping, or opaque handle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StructuredValue {
    /// JSON null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer or floating-point number
    Number(Number),
    /// String
    String(String),
    /// Ordered list
    List(Vec<StructuredValue>),
    /// String-keyed, insertion-ordered mapping
    Mapping(Mapping),
    /// Value that must never be traversed
    Opaque(OpaqueHandle),
}

impl StructuredValue {
    /// Human-readable kind name
    pub fn kind(&self) -> &'static str {
        match self {
            StructuredValue::Null => "null",
            StructuredValue::Bool(_) => "boolean",
            StructuredValue::Number(_) => "number",
            StructuredValue::String(_) => "string",
            StructuredValue::List(_) => "list",
            StructuredValue::Mapping(_) => "mapping",
            StructuredValue::Opaque(_) => "opaque",
        }
    }

    /// Borrow the mapping, if this is one
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            StructuredValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the list, if this is one
    pub fn as_list(&self) -> Option<&[StructuredValue]> {
        match self {
            StructuredValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key when this is a mapping
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Convert to `serde_json::Value`, failing on opaque handles.
    pub fn into_json(self) -> Result<Value, KeycaseError> {
        Value::try_from(self)
    }
}

impl From<bool> for StructuredValue {
    fn from(value: bool) -> Self {
        StructuredValue::Bool(value)
    }
}

impl From<i64> for StructuredValue {
    fn from(value: i64) -> Self {
        StructuredValue::Number(value.into())
    }
}

impl From<u64> for StructuredValue {
    fn from(value: u64) -> Self {
        StructuredValue::Number(value.into())
    }
}

impl From<&str> for StructuredValue {
    fn from(value: &str) -> Self {
        StructuredValue::String(value.to_string())
    }
}

impl From<String> for StructuredValue {
    fn from(value: String) -> Self {
        StructuredValue::String(value)
    }
}

impl From<Vec<StructuredValue>> for StructuredValue {
    fn from(value: Vec<StructuredValue>) -> Self {
        StructuredValue::List(value)
    }
}

impl From<Mapping> for StructuredValue {
    fn from(value: Mapping) -> Self {
        StructuredValue::Mapping(value)
    }
}

impl From<OpaqueHandle> for StructuredValue {
    fn from(value: OpaqueHandle) -> Self {
        StructuredValue::Opaque(value)
    }
}

/// Key order follows `serde_json::Map`, which is sorted unless serde_json's
/// `preserve_order` feature is on. Deserialize directly into
/// [`StructuredValue`] to keep document order.
impl From<Value> for StructuredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => StructuredValue::Null,
            Value::Bool(b) => StructuredValue::Bool(b),
            Value::Number(n) => StructuredValue::Number(n),
            Value::String(s) => StructuredValue::String(s),
            Value::Array(items) => {
                StructuredValue::List(items.into_iter().map(StructuredValue::from).collect())
            }
            Value::Object(map) => StructuredValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, StructuredValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<StructuredValue> for Value {
    type Error = KeycaseError;

    fn try_from(value: StructuredValue) -> Result<Self, Self::Error> {
        Ok(match value {
            StructuredValue::Null => Value::Null,
            StructuredValue::Bool(b) => Value::Bool(b),
            StructuredValue::Number(n) => Value::Number(n),
            StructuredValue::String(s) => Value::String(s),
            StructuredValue::List(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            StructuredValue::Mapping(map) => {
                let mut out = Map::new();
                for (key, value) in map {
                    out.insert(key, Value::try_from(value)?);
                }
                Value::Object(out)
            }
            StructuredValue::Opaque(handle) => {
                return Err(KeycaseError::OpaqueValue(handle.label().to_string()))
            }
        })
    }
}

impl Serialize for StructuredValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StructuredValue::Null => serializer.serialize_unit(),
            StructuredValue::Bool(b) => serializer.serialize_bool(*b),
            StructuredValue::Number(n) => n.serialize(serializer),
            StructuredValue::String(s) => serializer.serialize_str(s),
            StructuredValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            StructuredValue::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            StructuredValue::Opaque(handle) => Err(S::Error::custom(format!(
                "opaque value '{}' cannot be serialized",
                handle.label()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for StructuredValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StructuredValueVisitor)
    }
}

struct StructuredValueVisitor;

impl<'de> Visitor<'de> for StructuredValueVisitor {
    type Value = StructuredValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(StructuredValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(StructuredValue::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(StructuredValue::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Number::from_f64(v).map_or(StructuredValue::Null, StructuredValue::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(StructuredValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(StructuredValue::String(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(StructuredValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(StructuredValue::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(StructuredValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0).min(4096));
        while let Some((key, value)) = access.next_entry::<String, StructuredValue>()? {
            map.insert(key, value);
        }
        Ok(StructuredValue::Mapping(map))
    }
}

/// String-keyed mapping that keeps insertion order
///
/// Re-inserting an existing key replaces the value but keeps the key's
/// original position. Equality ignores order.
#[derive(Clone, Default)]
pub struct Mapping {
    entries: Vec<(String, StructuredValue)>,
    index: AHashMap<String, usize>,
}

impl Mapping {
    /// Empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty mapping with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: AHashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace. Returns the previous value for `key`, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: StructuredValue,
    ) -> Option<StructuredValue> {
        let key = key.into();
        if let Some(&slot) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[slot].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Value for `key`
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StructuredValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl FromIterator<(String, StructuredValue)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, StructuredValue)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Mapping::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for Mapping {
    type Item = (String, StructuredValue);
    type IntoIter = std::vec::IntoIter<(String, StructuredValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = (&'a String, &'a StructuredValue);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, StructuredValue)>,
        fn(&'a (String, StructuredValue)) -> (&'a String, &'a StructuredValue),
    >;

    fn into_iter(self) -> Self::IntoIter {
        let split: fn(&'a (String, StructuredValue)) -> (&'a String, &'a StructuredValue) =
            |(k, v)| (k, v);
        self.entries.iter().map(split)
    }
}

/// Shared handle to a value the transformer must not look inside
///
/// Equality is identity: two handles are equal when they point at the same
/// allocation.
#[derive(Clone)]
pub struct OpaqueHandle {
    label: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueHandle {
    /// Wrap `value` under a descriptive `label`.
    pub fn new<T: Any + Send + Sync>(label: impl Into<String>, value: T) -> Self {
        let label: String = label.into();
        Self {
            label: Arc::from(label),
            inner: Arc::new(value),
        }
    }

    /// Descriptive label given at construction
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrow the wrapped value as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for OpaqueHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueHandle").field(&self.label).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mapping_preserves_insertion_order() {
        let map: Mapping = [("b", 1i64), ("a", 2), ("c", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), StructuredValue::from(v)))
            .collect();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn mapping_replace_keeps_position() {
        let mut map = Mapping::new();
        map.insert("first", StructuredValue::from(1i64));
        map.insert("second", StructuredValue::from(2i64));
        let previous = map.insert("first", StructuredValue::from(10i64));
        assert_eq!(previous, Some(StructuredValue::from(1i64)));
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(map.get("first"), Some(&StructuredValue::from(10i64)));
    }

    #[test]
    fn mapping_equality_ignores_order() {
        let left = StructuredValue::from(json!({"a": 1, "b": [true, null]}));
        let right = StructuredValue::from(json!({"b": [true, null], "a": 1}));
        assert_eq!(left, right);
        assert_ne!(left, StructuredValue::from(json!({"a": 1})));
    }

    #[test]
    fn json_conversion_roundtrip() {
        let doc = json!({"user_id": 7, "tags": ["x", 1.5, false], "meta": {"k": null}});
        let value = StructuredValue::from(doc.clone());
        assert_eq!(value.get("user_id"), Some(&StructuredValue::from(7i64)));
        assert_eq!(value.into_json().unwrap(), doc);
    }

    #[test]
    fn opaque_rejected_by_json_conversion() {
        let handle = OpaqueHandle::new("socket", 42u32);
        let value = StructuredValue::List(vec![StructuredValue::Opaque(handle)]);
        let err = value.into_json().unwrap_err();
        assert!(matches!(err, KeycaseError::OpaqueValue(label) if label == "socket"));
    }

    #[test]
    fn opaque_rejected_by_serializer() {
        let value = StructuredValue::Opaque(OpaqueHandle::new("blob", vec![1u8, 2, 3]));
        assert!(serde_json::to_string(&value).is_err());
    }

    #[test]
    fn serialize_matches_json_value() {
        let doc = json!({"z": 1, "a": {"nested": [1, 2, {"deep": "x"}]}});
        let value = StructuredValue::from(doc.clone());
        let text = serde_json::to_string(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn opaque_equality_is_identity() {
        let a = OpaqueHandle::new("h", 1u8);
        let b = a.clone();
        let c = OpaqueHandle::new("h", 1u8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<u8>(), Some(&1));
        assert_eq!(a.downcast_ref::<u16>(), None);
    }

    #[test]
    fn deserialize_keeps_document_order() {
        let value: StructuredValue =
            serde_json::from_str(r#"{"zeta": 1, "alpha": {"y": 2, "b": 3}}"#).unwrap();
        let map = value.as_mapping().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        let inner = value.get("alpha").and_then(StructuredValue::as_mapping).unwrap();
        assert_eq!(inner.keys().collect::<Vec<_>>(), vec!["y", "b"]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"zeta":1,"alpha":{"y":2,"b":3}}"#
        );
    }

    #[test]
    fn deserialize_duplicate_key_keeps_last_value() {
        let value: StructuredValue = serde_json::from_str(r#"{"a": 1, "b": 2, "a": 3}"#).unwrap();
        let map = value.as_mapping().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&StructuredValue::from(3i64)));
    }

    #[test]
    fn kind_names() {
        assert_eq!(StructuredValue::Null.kind(), "null");
        assert_eq!(StructuredValue::from(json!([])).kind(), "list");
        assert_eq!(StructuredValue::from(json!({})).kind(), "mapping");
    }
}
