//! Remote store value representation.

use serde::{Deserialize, Serialize};

/// A value in the remote store's native domain: scalars plus ordered lists.
///
/// This is what actually travels over the wire. Scalars map 1:1 onto the
/// local typed domain except `Double`, which carries local floats at wire
/// precision. Lists carry string-sets; element order is an implementation
/// artifact, not semantic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteValue {
    /// UTF-8 string.
    Text(String),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit signed integer.
    Int(i32),
    /// Double-precision float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// Ordered list of values.
    List(Vec<RemoteValue>),
}

impl RemoteValue {
    /// Short name of the variant, used in log and error messages.
    pub fn shape_name(&self) -> &'static str {
        match self {
            RemoteValue::Text(_) => "text",
            RemoteValue::Long(_) => "long",
            RemoteValue::Int(_) => "int",
            RemoteValue::Double(_) => "double",
            RemoteValue::Bool(_) => "boolean",
            RemoteValue::List(_) => "list",
        }
    }
}
