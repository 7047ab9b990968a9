//! # Prefsync Remote
//!
//! Remote store and auth abstractions for prefsync.
//!
//! This crate provides:
//! - [`RemoteStore`]: a path-addressable, child-structured remote
//!   database offering one-shot fetch, live subscription, and
//!   partial-write semantics
//! - [`AuthProvider`]: resolution of the stable caller identity
//! - [`PrefPath`]: the `/{root}/{identity}/{name}` remote layout with
//!   segment sanitization
//! - [`MemoryRemoteStore`]: a functional in-memory store for tests and
//!   local development
//!
//! ## Delivery Contract
//!
//! Every operation is asynchronous: it returns immediately and reports
//! through a callback or observer that may run on an arbitrary thread.
//! Consumers synchronize the effects themselves and discard deliveries
//! that arrive for superseded fetches or subscriptions.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod error;
mod memory;
mod path;
mod store;

pub use auth::{AuthProvider, StaticAuth};
pub use error::{RemoteError, RemoteResult};
pub use memory::MemoryRemoteStore;
pub use path::{sanitize_segment, PrefPath};
pub use store::{
    ChildUpdate, Children, FetchCallback, FnObserver, PushCallback, RemoteStore,
    SubscriptionHandle, UpdateObserver,
};
