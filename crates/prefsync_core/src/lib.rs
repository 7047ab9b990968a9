//! # Prefsync Core
//!
//! A local-first, eventually-consistent preferences store synchronized
//! with a remote authoritative database.
//!
//! This crate provides:
//! - [`SyncedPrefs`]: typed reads over an in-memory cache, staged writes
//!   through an [`Editor`], per-key change notification, and
//!   pull/push/live-sync control
//! - [`PrefsRegistry`]: creation and caching of instances keyed by
//!   (identity, name)
//! - The sync engine: single-flight lazy loading, diff-based commits,
//!   wholesale replace on remote-originated snapshots
//!
//! ## Key Invariants
//!
//! - Local reads are synchronous and never observe a cache
//!   mid-replacement
//! - A commit is visible to local reads before the remote push resolves
//! - Remote snapshots are authoritative: applying one drops local-only
//!   keys
//! - At most one fetch is in flight per instance; concurrent readers
//!   share its outcome
//! - Change notification is per touched key, never per commit
//!
//! ## Usage
//!
//! ```
//! use prefsync_core::{PrefsConfig, PrefsRegistry};
//! use prefsync_remote::{MemoryRemoteStore, StaticAuth};
//! use std::sync::Arc;
//!
//! let registry = PrefsRegistry::new(
//!     Arc::new(StaticAuth::signed_in("alice")),
//!     Arc::new(MemoryRemoteStore::new()),
//!     PrefsConfig::default(),
//! );
//!
//! let prefs = registry.instance("settings").unwrap();
//! prefs.edit().put_string("theme", "dark").commit();
//! assert_eq!(prefs.get_string("theme", "light"), "dark");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod diff;
mod editor;
mod error;
mod feed;
mod registry;
mod store;

pub use cache::LocalCache;
pub use config::PrefsConfig;
pub use diff::{diff, ChangeKind, KeyChange};
pub use editor::Editor;
pub use error::{PrefsError, PrefsResult};
pub use feed::{ChangeFeed, KeyChangeEvent};
pub use registry::PrefsRegistry;
pub use store::{CompletionCallback, SyncedPrefs};

pub use prefsync_codec::{PrefValue, RemoteValue};
