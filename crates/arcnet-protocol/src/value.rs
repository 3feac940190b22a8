//! The dynamic value carried by remote calls.
//!
//! Network types validate and convert *host-native* values: whatever the
//! application passed to `send_to_player` or returned from a callback.
//! [`Value`] is that host-native value. The same enum is also used for the
//! wire form of a plain-mode payload, because the logical⇄wire conversions
//! of network types map values to other values (a literal becomes its
//! ordinal, a set becomes an array, a record becomes a field-ordered
//! array).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ObjectId, PlayerId};

/// A dynamically typed value.
///
/// ## Equality
///
/// Equality is *observable* equality: two `Set`s are equal when they hold
/// the same elements in any order, and two `Map`s are equal when they hold
/// the same entries in any order. This is what round-trip laws compare,
/// since set and map encodings are canonicalized (sorted) on the wire.
///
/// ## Wire shape
///
/// Adjacently tagged: `{"type": "String", "value": "hello"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// The absent value. Optional arguments that were left out are `Nil`.
    #[default]
    Nil,
    Bool(bool),
    /// Every number is an `f64`; integer network types check ranges.
    Number(f64),
    String(String),
    /// Raw bytes.
    Buffer(Vec<u8>),
    Array(Vec<Value>),
    /// Unordered, unique elements.
    Set(Vec<Value>),
    /// Unordered key/value entries.
    Map(Vec<(Value, Value)>),
    /// Named fields, for struct network types.
    Record(BTreeMap<String, Value>),
    /// One case of a closed union.
    Variant { tag: String, value: Box<Value> },
    /// A reference to a connected player.
    Player(PlayerId),
    /// A reference to an application object.
    Object(ObjectId),
}

impl Value {
    /// Short name of the variant, used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Buffer(_) => "buffer",
            Self::Array(_) => "array",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Variant { .. } => "variant",
            Self::Player(_) => "player",
            Self::Object(_) => "object",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<PlayerId> {
        match self {
            Self::Player(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Builds a record from `(field, value)` pairs.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a variant value.
    pub fn variant(tag: impl Into<String>, value: Value) -> Self {
        Self::Variant {
            tag: tag.into(),
            value: Box::new(value),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Buffer(a), Self::Buffer(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => same_elements(a, b),
            (Self::Map(a), Self::Map(b)) => same_elements(a, b),
            (Self::Record(a), Self::Record(b)) => same_fields(a, b),
            (
                Self::Variant { tag: ta, value: va },
                Self::Variant { tag: tb, value: vb },
            ) => ta == tb && va == vb,
            (Self::Player(a), Self::Player(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Order-insensitive comparison. Each element of `b` may match at most one
/// element of `a`, so duplicates are counted.
fn same_elements<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut matched = vec![false; b.len()];
    for x in a {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, y)| !matched[i] && x == y);
        match found {
            Some(i) => matched[i] = true,
            None => return false,
        }
    }
    true
}

/// A `Nil` field and a missing field are the same thing.
fn same_fields(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> bool {
    let present = |m: &BTreeMap<String, Value>| m.values().filter(|v| !v.is_nil()).count();
    present(a) == present(b)
        && a.iter()
            .filter(|(_, v)| !v.is_nil())
            .all(|(k, v)| b.get(k) == Some(v))
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<PlayerId> for Value {
    fn from(id: PlayerId) -> Self {
        Self::Player(id)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}
