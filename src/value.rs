use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identity of a heap object.
///
/// An id carries the tag of the heap that allocated it, and indices are
/// assigned monotonically per heap and never reused, so a stale or foreign
/// id can never alias another object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub(crate) heap: u64,
    pub(crate) index: u64,
}

impl ObjectId {
    /// Position of the object in its heap's allocation order.
    pub fn as_u64(self) -> u64 {
        self.index
    }

    /// Tag of the heap that allocated this object.
    pub fn heap_tag(self) -> u64 {
        self.heap
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj-{}.{}", self.heap, self.index)
    }
}

/// A host value as seen by test bodies.
///
/// Only [`Value::Object`] is referenceable; everything else is a primitive
/// and cannot be the target of a weak reference.
///
/// # Examples
///
/// ```rust
/// use weakspec::value::Value;
/// assert!(Value::Null.is_null());
/// assert!(!Value::Number(0.0).is_referenceable());
/// assert_eq!(Value::Undefined.type_name(), "undefined");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectId),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for anything other than `undefined`.
    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    /// True only for values that may be the target of a weak reference.
    pub fn is_referenceable(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Object(id) => write!(f, "[object {}]", id),
        }
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_objects_are_referenceable() {
        let primitives = [
            Value::Undefined,
            Value::Null,
            Value::Bool(true),
            Value::Number(0.0),
            Value::String("s".into()),
        ];
        for value in primitives {
            assert!(!value.is_referenceable(), "{} should be primitive", value);
        }
        assert!(Value::Object(ObjectId { heap: 0, index: 3 }).is_referenceable());
    }

    #[test]
    fn display_matches_host_rendering() {
        assert_eq!(
            Value::Object(ObjectId { heap: 2, index: 7 }).to_string(),
            "[object obj-2.7]"
        );
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        assert_eq!(Value::default().to_string(), "undefined");
    }
}
