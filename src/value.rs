//! Property values.
//!
//! Every component field is read and written through [`Value`], a small closed
//! set of variants. A field declares its [`ValueKind`] up front and mutators
//! reject values of any other kind.

use serde::{Deserialize, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Int,
    Float,
    Bool,
    Opaque,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Anything else a component wants to keep in a field. Compared by identity.
    Opaque(Rc<dyn Any>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "Text({:?})", s),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Opaque(_) => f.write_str("[opaque]"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Opaque(_) => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// A Rust type that can back a component field.
///
/// `from_value` must only accept values of exactly `KIND`; it returns `None`
/// for anything else, which the wrapper turns into a type mismatch.
pub trait FieldValue: Sized + 'static {
    const KIND: ValueKind;

    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl FieldValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(x),
            _ => None,
        }
    }
}

/// Integer field types that widen into `i64` without loss.
macro_rules! int_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                const KIND: ValueKind = ValueKind::Int;

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Option<Self> {
                    value.as_int().and_then(|n| <$ty>::try_from(n).ok())
                }
            }
        )*
    };
}

int_field!(i64, i32, u32);

impl<T: Any> FieldValue for Rc<T> {
    const KIND: ValueKind = ValueKind::Opaque;

    fn to_value(&self) -> Value {
        Value::Opaque(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Opaque(any) => any.downcast::<T>().ok(),
            _ => None,
        }
    }
}
