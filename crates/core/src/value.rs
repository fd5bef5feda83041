//! Tree value model for tagstore
//!
//! This module defines:
//! - TreeValue: the structured value format stores export to and import from
//! - Compound: immutable string-keyed map of tree values, cheap to clone
//! - CompoundBuilder: mutable variant used during incremental construction
//!
//! ## Value Model
//!
//! The TreeValue enum has exactly 7 variants:
//! - Bool, Int, Float, String, Bytes, List, Compound
//!
//! There is no null variant: absence is modeled by the store itself (a
//! missing slot), never by a sentinel value.
//!
//! ### Type Rules
//!
//! - No implicit type coercions
//! - `Int(1) != Float(1.0)` - different types are NEVER equal
//! - `Bytes` are not `String`
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`

use crate::error::TagError;
use once_cell::sync::Lazy;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Canonical tree value type used for export/import
///
/// Different types are NEVER equal, even if they contain the same "value":
/// - `Int(1) != Float(1.0)`
/// - `Bytes(b"hello") != String("hello")`
///
/// Float equality follows IEEE-754 semantics:
/// - `NaN != NaN`
/// - `-0.0 == 0.0`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeValue {
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// List of values
    List(Vec<TreeValue>),
    /// Nested compound with string keys
    Compound(Compound),
}

// Custom PartialEq implementation for IEEE-754 float semantics
impl PartialEq for TreeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TreeValue::Bool(a), TreeValue::Bool(b)) => a == b,
            (TreeValue::Int(a), TreeValue::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (TreeValue::Float(a), TreeValue::Float(b)) => a == b,
            (TreeValue::String(a), TreeValue::String(b)) => a == b,
            (TreeValue::Bytes(a), TreeValue::Bytes(b)) => a == b,
            (TreeValue::List(a), TreeValue::List(b)) => a == b,
            (TreeValue::Compound(a), TreeValue::Compound(b)) => a == b,
            // Different types are NEVER equal
            _ => false,
        }
    }
}

impl TreeValue {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            TreeValue::Bool(_) => "Bool",
            TreeValue::Int(_) => "Int",
            TreeValue::Float(_) => "Float",
            TreeValue::String(_) => "String",
            TreeValue::Bytes(_) => "Bytes",
            TreeValue::List(_) => "List",
            TreeValue::Compound(_) => "Compound",
        }
    }

    /// Check if this is a compound value
    pub fn is_compound(&self) -> bool {
        matches!(self, TreeValue::Compound(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TreeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TreeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            TreeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TreeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[u8] if this is a Bytes value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TreeValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get as &[TreeValue] if this is a List value
    pub fn as_list(&self) -> Option<&[TreeValue]> {
        match self {
            TreeValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get as &Compound if this is a Compound value
    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            TreeValue::Compound(c) => Some(c),
            _ => None,
        }
    }
}

/// Immutable string-keyed compound of tree values
///
/// Cloning is O(1): the underlying map is shared behind an `Arc`. Iteration
/// is key-ordered. Use [`CompoundBuilder`] to construct or modify.
#[derive(Debug, Clone)]
pub struct Compound {
    map: Arc<BTreeMap<String, TreeValue>>,
}

static EMPTY: Lazy<Compound> = Lazy::new(|| Compound {
    map: Arc::new(BTreeMap::new()),
});

impl Compound {
    /// The canonical shared empty compound (no allocation)
    pub fn empty() -> Compound {
        EMPTY.clone()
    }

    /// Start building a new compound
    pub fn builder() -> CompoundBuilder {
        CompoundBuilder::new()
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&TreeValue> {
        self.map.get(key)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TreeValue)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the compound has no entries
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Copy the entries into a mutable builder
    pub fn to_builder(&self) -> CompoundBuilder {
        CompoundBuilder {
            map: self.map.as_ref().clone(),
        }
    }
}

impl PartialEq for Compound {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.map, &other.map) || self.map == other.map
    }
}

impl From<BTreeMap<String, TreeValue>> for Compound {
    fn from(map: BTreeMap<String, TreeValue>) -> Self {
        Compound { map: Arc::new(map) }
    }
}

impl Serialize for Compound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Compound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, TreeValue>::deserialize(deserializer).map(Compound::from)
    }
}

/// Mutable compound under construction
///
/// `build()` freezes the entries into an immutable [`Compound`].
#[derive(Debug, Clone, Default)]
pub struct CompoundBuilder {
    map: BTreeMap<String, TreeValue>,
}

impl CompoundBuilder {
    /// Create an empty builder
    pub fn new() -> CompoundBuilder {
        CompoundBuilder::default()
    }

    /// Insert a value, replacing any previous entry for the key
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<TreeValue>) -> &mut Self {
        self.map.insert(key.into(), value.into());
        self
    }

    /// Remove a key, returning its previous value
    pub fn remove(&mut self, key: &str) -> Option<TreeValue> {
        self.map.remove(key)
    }

    /// Check if the builder has no entries
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Freeze into an immutable compound
    pub fn build(self) -> Compound {
        if self.map.is_empty() {
            Compound::empty()
        } else {
            Compound::from(self.map)
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<bool> for TreeValue {
    fn from(b: bool) -> Self {
        TreeValue::Bool(b)
    }
}

impl From<i64> for TreeValue {
    fn from(i: i64) -> Self {
        TreeValue::Int(i)
    }
}

impl From<i32> for TreeValue {
    fn from(i: i32) -> Self {
        TreeValue::Int(i as i64)
    }
}

impl From<f64> for TreeValue {
    fn from(f: f64) -> Self {
        TreeValue::Float(f)
    }
}

impl From<f32> for TreeValue {
    fn from(f: f32) -> Self {
        TreeValue::Float(f as f64)
    }
}

impl From<&str> for TreeValue {
    fn from(s: &str) -> Self {
        TreeValue::String(s.to_string())
    }
}

impl From<String> for TreeValue {
    fn from(s: String) -> Self {
        TreeValue::String(s)
    }
}

impl From<Vec<u8>> for TreeValue {
    fn from(b: Vec<u8>) -> Self {
        TreeValue::Bytes(b)
    }
}

impl From<Vec<TreeValue>> for TreeValue {
    fn from(l: Vec<TreeValue>) -> Self {
        TreeValue::List(l)
    }
}

impl From<Compound> for TreeValue {
    fn from(c: Compound) -> Self {
        TreeValue::Compound(c)
    }
}

// ============================================================================
// serde_json interop for ergonomic construction and structure tags
// ============================================================================

impl From<TreeValue> for serde_json::Value {
    fn from(v: TreeValue) -> Self {
        match v {
            TreeValue::Bool(b) => serde_json::Value::Bool(b),
            TreeValue::Int(i) => serde_json::Value::Number(i.into()),
            TreeValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            TreeValue::String(s) => serde_json::Value::String(s),
            // Bytes become an array of numbers, matching serde_json's own
            // representation of Vec<u8>. The reverse direction yields a List,
            // so Bytes do not round-trip through JSON.
            TreeValue::Bytes(b) => {
                serde_json::Value::Array(b.into_iter().map(|x| x.into()).collect())
            }
            TreeValue::List(l) => {
                serde_json::Value::Array(l.into_iter().map(serde_json::Value::from).collect())
            }
            TreeValue::Compound(c) => serde_json::Value::Object(
                c.iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::from(v.clone())))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<serde_json::Value> for TreeValue {
    type Error = TagError;

    /// Convert a JSON value into a tree value
    ///
    /// Object members with `null` values are treated as absent and dropped,
    /// mirroring the store's removal semantics. A `null` anywhere else (bare
    /// or inside an array) has no tree representation and fails.
    fn try_from(v: serde_json::Value) -> Result<Self, TagError> {
        match v {
            serde_json::Value::Null => Err(TagError::TypeMismatch {
                expected: "non-null value",
                found: "Null",
            }),
            serde_json::Value::Bool(b) => Ok(TreeValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(TreeValue::Int(i))
                } else {
                    // u64 that doesn't fit in i64, or a true float
                    Ok(TreeValue::Float(n.as_f64().unwrap_or(0.0)))
                }
            }
            serde_json::Value::String(s) => Ok(TreeValue::String(s)),
            serde_json::Value::Array(arr) => Ok(TreeValue::List(
                arr.into_iter()
                    .map(TreeValue::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            serde_json::Value::Object(obj) => {
                let mut builder = CompoundBuilder::new();
                for (k, v) in obj {
                    if v.is_null() {
                        continue;
                    }
                    builder.put(k, TreeValue::try_from(v)?);
                }
                Ok(TreeValue::Compound(builder.build()))
            }
        }
    }
}
