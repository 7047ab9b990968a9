//! Typed preference value domain.

use std::collections::BTreeSet;

/// A typed preference value.
///
/// A key's stored variant determines its typed accessor contract: reading
/// a key through a mismatched accessor yields the caller-supplied default
/// rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefValue {
    /// UTF-8 string.
    Text(String),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// Boolean.
    Bool(bool),
    /// Unordered set of strings. Duplicates are eliminated on insertion;
    /// `BTreeSet` keeps iteration deterministic for diffing and encoding.
    StringSet(BTreeSet<String>),
}

impl PrefValue {
    /// Get this value as a string, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PrefValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a long, if it is one.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            PrefValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as an int, if it is one.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            PrefValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float, if it is one.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            PrefValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a string set, if it is one.
    pub fn as_string_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            PrefValue::StringSet(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PrefValue::Text(_) => "string",
            PrefValue::Long(_) => "long",
            PrefValue::Int(_) => "int",
            PrefValue::Float(_) => "float",
            PrefValue::Bool(_) => "boolean",
            PrefValue::StringSet(_) => "string-set",
        }
    }
}

impl From<String> for PrefValue {
    fn from(s: String) -> Self {
        PrefValue::Text(s)
    }
}

impl From<&str> for PrefValue {
    fn from(s: &str) -> Self {
        PrefValue::Text(s.to_string())
    }
}

impl From<i64> for PrefValue {
    fn from(n: i64) -> Self {
        PrefValue::Long(n)
    }
}

impl From<i32> for PrefValue {
    fn from(n: i32) -> Self {
        PrefValue::Int(n)
    }
}

impl From<f32> for PrefValue {
    fn from(f: f32) -> Self {
        PrefValue::Float(f)
    }
}

impl From<bool> for PrefValue {
    fn from(b: bool) -> Self {
        PrefValue::Bool(b)
    }
}

impl From<BTreeSet<String>> for PrefValue {
    fn from(s: BTreeSet<String>) -> Self {
        PrefValue::StringSet(s)
    }
}
