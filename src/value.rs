/*! The heterogeneous value type carried by tags, messages, and settings.

The streaming runtime has no reflection: every tag, every message field, and
every per-block setting that isn't known at compile time is carried as a
[`Value`]. This replaces ad-hoc per-field enums (one for tags, one for
messages, one for settings) with a single sum type, per the property-map
design note.
*/
use crate::Float;

/// A dynamically typed scalar or small aggregate.
///
/// `Null` is a first-class value (not the absence of one): it's used as the
/// payload of marker tags like `invalid_header` and `header_start`, where the
/// key's presence is the signal, not any particular value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// No payload; presence of the key is the signal.
    Null,
    /// Signed integer.
    I64(i64),
    /// Unsigned integer.
    U64(u64),
    /// Double precision float.
    F64(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Nested list of values.
    Vec(Vec<Value>),
}

impl Value {
    /// Return the value as `i64`, if it can be represented as one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            Value::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Return the value as `u64`, if it can be represented as one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            Value::I64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Return the value as `f64`, if it's numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::I64(v) => Some(*v as f64),
            Value::U64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Return the value as a string slice, if it's a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Return true if the value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}
impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::U64(v as u64)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}
impl From<Float> for Value {
    fn from(v: Float) -> Self {
        Value::F64(v as f64)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "{v:02x?}"),
            Value::Vec(v) => write!(f, "{v:?}"),
        }
    }
}
