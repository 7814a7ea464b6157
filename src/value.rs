//! The closed, recursive value model used at the host/script boundary.
//!
//! Everything that crosses into or out of the interpreter is expressed as a
//! [`Value`]: a tagged union over scalars, sequences and key/value mappings
//! of arbitrary nesting. Marshalling is driven by the *target* host type
//! (the [`FromValue`] implementation picks the conversion), and every
//! mismatch is a typed [`ValueError`] rather than a silent coercion or a
//! panic.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use thiserror::Error;

/// A script-visible value. Sequences and mappings may nest to unbounded
/// depth; no other shape exists.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(BTreeMap<Key, Value>),
}

/// A mapping key. The interpreter only produces integer or string keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Key {
    Integer(i64),
    Str(String),
}

impl Value {
    /// Short kind name used in conversion diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
        }
    }
}

impl Key {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Key::Integer(_) => "integer",
            Key::Str(_) => "string",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("cannot convert {found} into {expected}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot convert a {found}-keyed mapping into a {expected}-keyed target")]
    KeyMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported script value: {0}")]
    Unsupported(String),
}

/// Conversion from a host value into the script value model.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion out of the script value model, driven by the requested target
/// type.
pub trait FromValue: Sized {
    /// # Errors
    ///
    /// Returns a [`ValueError`] when the value's shape does not fit the
    /// target type.
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

/// Host key types usable in a mapping target.
pub trait IntoKey {
    fn into_key(self) -> Key;
}

pub trait FromKey: Sized {
    /// # Errors
    ///
    /// Returns [`ValueError::KeyMismatch`] when the key kind does not match
    /// the target key type.
    fn from_key(key: &Key) -> Result<Self, ValueError>;
}

// scalars

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(ValueError::Mismatch {
                expected: "bool",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Integer(i) => Ok(*i),
            other => Err(ValueError::Mismatch {
                expected: "integer",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => {
                // Lua does not distinguish 2 from 2.0 reliably.
                #[allow(clippy::cast_precision_loss)]
                Ok(*i as f64)
            }
            other => Err(ValueError::Mismatch {
                expected: "float",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            // Mirrors Lua's number/string duality; booleans and composites
            // are never coerced.
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            other => Err(ValueError::Mismatch {
                expected: "string",
                found: other.kind(),
            }),
        }
    }
}

// keys

impl IntoKey for i64 {
    fn into_key(self) -> Key {
        Key::Integer(self)
    }
}

impl IntoKey for String {
    fn into_key(self) -> Key {
        Key::Str(self)
    }
}

impl IntoKey for &str {
    fn into_key(self) -> Key {
        Key::Str(self.to_string())
    }
}

impl FromKey for i64 {
    fn from_key(key: &Key) -> Result<Self, ValueError> {
        match key {
            Key::Integer(i) => Ok(*i),
            Key::Str(_) => Err(ValueError::KeyMismatch {
                expected: "integer",
                found: "string",
            }),
        }
    }
}

impl FromKey for String {
    fn from_key(key: &Key) -> Result<Self, ValueError> {
        match key {
            Key::Str(s) => Ok(s.clone()),
            Key::Integer(_) => Err(ValueError::KeyMismatch {
                expected: "string",
                found: "integer",
            }),
        }
    }
}

// composites

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Seq(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<K: IntoKey, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_key(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: IntoKey, V: IntoValue> IntoValue for HashMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_key(), v.into_value()))
                .collect(),
        )
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Seq(items) => items.iter().map(T::from_value).collect(),
            // The interpreter renders sequences as 1-based integer-keyed
            // tables; accept those in key order.
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| match key {
                    Key::Integer(_) => T::from_value(item),
                    Key::Str(_) => Err(ValueError::KeyMismatch {
                        expected: "integer",
                        found: "string",
                    }),
                })
                .collect(),
            other => Err(ValueError::Mismatch {
                expected: "sequence",
                found: other.kind(),
            }),
        }
    }
}

impl<K: FromKey + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((K::from_key(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(ValueError::Mismatch {
                expected: "mapping",
                found: other.kind(),
            }),
        }
    }
}

impl<K: FromKey + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((K::from_key(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(ValueError::Mismatch {
                expected: "mapping",
                found: other.kind(),
            }),
        }
    }
}

/// Marshal a host value into the script value model.
pub fn marshal<T: IntoValue>(host: T) -> Value {
    host.into_value()
}

/// Unmarshal a script value into the requested host type.
///
/// # Errors
///
/// Returns a [`ValueError`] when the value's shape does not fit `T`.
pub fn unmarshal<T: FromValue>(value: &Value) -> Result<T, ValueError> {
    T::from_value(value)
}
