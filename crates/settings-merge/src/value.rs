//! Format-agnostic document tree that the merge engine operates over.
//!
//! A settings document is parsed into a [`Value`] once, merged, and serialized
//! back out. The tree mirrors JSON's six node kinds. Objects are kept as an
//! ordered list of `(key, value)` pairs so that key order survives a merge and
//! diffs of the persisted file stay small.

use std::fmt;
use std::slice;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

use crate::error::{Result, SettingsError};

/// A node in a settings document.
///
/// `Clone` and `PartialEq` walk the tree with an explicit stack, so deep
/// documents are copied and compared without growing the call stack.
#[derive(Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// Numbers keep their exact textual form (serde_json `arbitrary_precision`).
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

/// The variant tag of a [`Value`], used for dispatch and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        };
        f.write_str(name)
    }
}

impl Kind {
    /// Objects and arrays are containers; everything else is a scalar leaf.
    pub fn is_container(self) -> bool {
        matches!(self, Kind::Array | Kind::Object)
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_container(&self) -> bool {
        self.kind().is_container()
    }

    /// Borrow the entries of an object.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TypeMismatch`] if the value is not an object.
    pub fn as_object(&self) -> Result<&Object> {
        match self {
            Value::Object(obj) => Ok(obj),
            other => Err(SettingsError::TypeMismatch {
                expected: Kind::Object,
                found: other.kind(),
            }),
        }
    }

    /// Borrow the elements of an array.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TypeMismatch`] if the value is not an array.
    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(SettingsError::TypeMismatch {
                expected: Kind::Array,
                found: other.kind(),
            }),
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let mut current = match Partial::open(self) {
            Opened::Container(partial) => partial,
            Opened::Leaf(leaf) => return leaf,
        };
        let mut stack: Vec<Partial<'_>> = Vec::new();

        loop {
            match current.next_child() {
                Some(child) => match Partial::open(child) {
                    Opened::Container(partial) => {
                        stack.push(std::mem::replace(&mut current, partial));
                    }
                    Opened::Leaf(leaf) => current.push(leaf),
                },
                None => match stack.pop() {
                    Some(parent) => {
                        let done = std::mem::replace(&mut current, parent);
                        current.push(done.close());
                    }
                    None => return current.close(),
                },
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];

        while let Some(pair) = pending.pop() {
            match pair {
                (Value::Null, Value::Null) => {}
                (Value::Bool(a), Value::Bool(b)) if a == b => {}
                (Value::Number(a), Value::Number(b)) if a == b => {}
                (Value::String(a), Value::String(b)) if a == b => {}
                (Value::Array(a), Value::Array(b)) if a.len() == b.len() => {
                    pending.extend(a.iter().zip(b));
                }
                (Value::Object(a), Value::Object(b)) if a.len() == b.len() => {
                    for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                        if ka != kb {
                            return false;
                        }
                        pending.push((va, vb));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

/// A container being copied by `Value::clone`.
enum Partial<'a> {
    Array(slice::Iter<'a, Value>, Vec<Value>),
    Object(slice::Iter<'a, (String, Value)>, Object, Option<&'a str>),
}

enum Opened<'a> {
    Container(Partial<'a>),
    Leaf(Value),
}

impl<'a> Partial<'a> {
    fn open(value: &'a Value) -> Opened<'a> {
        match value {
            Value::Array(items) => {
                Opened::Container(Partial::Array(items.iter(), Vec::with_capacity(items.len())))
            }
            Value::Object(obj) => Opened::Container(Partial::Object(
                obj.iter(),
                Object::with_capacity(obj.len()),
                None,
            )),
            Value::Null => Opened::Leaf(Value::Null),
            Value::Bool(b) => Opened::Leaf(Value::Bool(*b)),
            Value::Number(n) => Opened::Leaf(Value::Number(n.clone())),
            Value::String(s) => Opened::Leaf(Value::String(s.clone())),
        }
    }

    fn next_child(&mut self) -> Option<&'a Value> {
        match self {
            Partial::Array(src, _) => src.next(),
            Partial::Object(src, _, pending) => src.next().map(|(key, value)| {
                *pending = Some(key.as_str());
                value
            }),
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Partial::Array(_, out) => out.push(value),
            Partial::Object(_, out, pending) => {
                if let Some(key) = pending.take() {
                    out.entries.push((key.to_owned(), value));
                }
            }
        }
    }

    fn close(self) -> Value {
        match self {
            Partial::Array(_, out) => Value::Array(out),
            Partial::Object(_, out, _) => Value::Object(out),
        }
    }
}

/// Ordered key-value pairs with unique keys, in first-insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Look up `key`. An explicit `null` is `Some(&Value::Null)`, which is
    /// distinct from an absent key (`None`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a binding. An existing key keeps its position and has its value
    /// replaced; the previous value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Append a binding whose key the caller knows is not yet present.
    pub(crate) fn push_unique(&mut self, key: String, value: Value) {
        debug_assert!(!self.contains_key(&key), "duplicate key {key:?}");
        self.entries.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut obj = Object::new();
        for (key, value) in iter {
            obj.insert(key, value);
        }
        obj
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ── serde_json bridge ──────────────────────────────────────────────────────
//
// serde_json is built with `preserve_order`, so its `Map` iterates in
// insertion order and keys are already unique.

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut obj = Object::with_capacity(map.len());
                for (key, child) in map {
                    obj.push_unique(key, Value::from(child));
                }
                Value::Object(obj)
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(obj) => obj.serialize(serializer),
        }
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_distinguishes_null_from_absent() {
        let value = Value::from(json!({"a": null}));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("a"), Some(&Value::Null));
        assert_eq!(obj.get("b"), None);
    }

    #[test]
    fn typed_accessors_report_mismatch() {
        let value = Value::String("x".into());
        match value.as_array() {
            Err(SettingsError::TypeMismatch { expected, found }) => {
                assert_eq!(expected, Kind::Array);
                assert_eq!(found, Kind::String);
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
        assert!(value.as_object().is_err());
    }

    #[test]
    fn insert_keeps_first_position() {
        let mut obj = Object::new();
        obj.insert("a", Value::Bool(true));
        obj.insert("b", Value::Null);
        let previous = obj.insert("a", Value::Bool(false));
        assert_eq!(previous, Some(Value::Bool(true)));
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(obj.get("a"), Some(&Value::Bool(false)));
    }

    #[test]
    fn serde_json_bridge_preserves_order() {
        let source = json!({"z": 1, "a": [true, null], "m": {"y": "s", "b": 2.5}});
        let value = Value::from(source.clone());
        let keys: Vec<&str> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(serde_json::Value::from(value), source);
    }

    #[test]
    fn kind_display_is_lowercase() {
        assert_eq!(Kind::Object.to_string(), "object");
        assert!(Kind::Array.is_container());
        assert!(!Kind::Null.is_container());
    }

    #[test]
    fn clone_and_eq_cover_every_kind() {
        let value = Value::from(json!({"a": [1, "s", null, {"b": true}], "c": {}, "d": 2.5}));
        let copy = value.clone();
        assert_eq!(copy, value);
        assert_eq!(serde_json::to_string(&copy).unwrap(), serde_json::to_string(&value).unwrap());
    }

    #[test]
    fn eq_is_order_and_kind_sensitive() {
        assert_ne!(Value::from(json!({"a": 1, "b": 2})), Value::from(json!({"b": 2, "a": 1})));
        assert_ne!(Value::from(json!([1, 2])), Value::from(json!([2, 1])));
        assert_ne!(Value::from(json!([1])), Value::from(json!([1, 1])));
        assert_ne!(Value::from(json!({"a": null})), Value::from(json!({"a": false})));
        assert_ne!(Value::from(json!("1")), Value::from(json!(1)));
    }
}
