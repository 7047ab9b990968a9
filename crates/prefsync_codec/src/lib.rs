//! # Prefsync Codec
//!
//! Typed preference values and their remote representation.
//!
//! This crate defines the two value domains of a synchronized preferences
//! store and the conversions between them:
//! - [`PrefValue`]: the local typed domain (string, long, int, float,
//!   boolean, string-set)
//! - [`RemoteValue`]: the remote store's native domain (scalars plus
//!   ordered lists)
//!
//! ## Conversion Rules
//!
//! - Scalars map 1:1; floats travel as doubles
//! - A string-set encodes as an ordered list of text values; list order
//!   is an implementation artifact
//! - Decoding collects list elements into a set, discarding duplicates
//! - An unrecognized remote shape fails decoding of that single value
//!   only; callers skip the key and keep going
//!
//! ## Usage
//!
//! ```
//! use prefsync_codec::{decode, encode, PrefValue};
//!
//! let value = PrefValue::Long(42);
//! let remote = encode(&value);
//! assert_eq!(decode(&remote).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod remote;
mod value;

pub use codec::{decode, encode};
pub use error::{CodecError, CodecResult};
pub use remote::RemoteValue;
pub use value::PrefValue;
