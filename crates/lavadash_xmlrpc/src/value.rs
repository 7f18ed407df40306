//! Dynamic XML-RPC value type.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// A dynamic XML-RPC value.
///
/// Covers the types of the XML-RPC specification plus the `nil`
/// extension, which dashboard servers enable (`allow_none`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<nil/>`.
    Nil,
    /// `<boolean>`.
    Boolean(bool),
    /// `<int>` / `<i4>`.
    Int(i32),
    /// `<double>`.
    Double(f64),
    /// `<string>` (or an untyped `<value>`).
    String(String),
    /// `<dateTime.iso8601>`, decoded to a naive timestamp.
    DateTime(NaiveDateTime),
    /// `<base64>`.
    Base64(Vec<u8>),
    /// `<array>`.
    Array(Vec<Value>),
    /// `<struct>`; member names are unique and kept sorted.
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Build a struct value from `(name, value)` pairs.
    ///
    /// Later duplicates replace earlier ones.
    pub fn structure<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wrap an optional string, mapping `None` to `nil`.
    pub fn optional_string(value: Option<&str>) -> Self {
        value.map_or(Value::Nil, |s| Value::String(s.to_string()))
    }

    /// Check if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a double, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a timestamp, if it is one.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get binary content.
    ///
    /// Older servers send bundle content as a plain string, so strings
    /// are accepted as their UTF-8 bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Base64(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Get this value as an array slice, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get this value as a struct, if it is one.
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Look up a struct member by name.
    ///
    /// Returns `None` for non-struct values and missing members.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(name))
    }

    /// Name of the XML-RPC type element for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Base64(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_member_lookup() {
        let value = Value::structure([
            ("pathname", Value::from("/anonymous/")),
            ("bundle_count", Value::Int(3)),
        ]);
        assert_eq!(value.get("pathname").and_then(Value::as_str), Some("/anonymous/"));
        assert_eq!(value.get("bundle_count").and_then(Value::as_i32), Some(3));
        assert!(value.get("missing").is_none());
        assert!(Value::Int(1).get("pathname").is_none());
    }

    #[test]
    fn strings_count_as_bytes() {
        assert_eq!(Value::from("abc").as_bytes(), Some(&b"abc"[..]));
        assert_eq!(Value::Base64(vec![0, 1]).as_bytes(), Some(&[0u8, 1][..]));
        assert!(Value::Int(1).as_bytes().is_none());
    }

    #[test]
    fn option_maps_to_nil() {
        assert!(Value::from(None::<String>).is_nil());
        assert_eq!(Value::optional_string(Some("x")), Value::from("x"));
    }
}
