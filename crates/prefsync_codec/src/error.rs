//! Error types for the value codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding remote values.
///
/// A decode failure affects exactly one key; callers log it and omit the
/// key rather than failing the surrounding load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// The remote value has no counterpart in the typed domain.
    #[error("unsupported remote shape: {shape}")]
    UnsupportedShape {
        /// Shape name of the offending value.
        shape: String,
    },

    /// A list contained a non-text element and cannot decode as a
    /// string-set.
    #[error("list element {index} is {shape}, expected text")]
    MixedList {
        /// Index of the offending element.
        index: usize,
        /// Shape name of the offending element.
        shape: String,
    },
}
