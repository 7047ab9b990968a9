//! Remote store abstraction.

use crate::error::{RemoteError, RemoteResult};
use crate::path::PrefPath;
use prefsync_codec::RemoteValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One remote snapshot of a preferences node: key to remote value.
pub type Children = BTreeMap<String, RemoteValue>;

/// A partial write: `Some` sets a child, `None` deletes it.
pub type ChildUpdate = BTreeMap<String, Option<RemoteValue>>;

/// Completion callback for a one-shot fetch.
pub type FetchCallback = Box<dyn FnOnce(RemoteResult<Children>) + Send>;

/// Completion callback for a partial write.
pub type PushCallback = Box<dyn FnOnce(RemoteResult<()>) + Send>;

/// Identifies one live subscription for unsubscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Creates a handle from a store-assigned id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The store-assigned id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Receives live updates for a subscribed path.
///
/// Callbacks may arrive on an arbitrary thread; implementations must
/// synchronize their own state. The initial snapshot is delivered during
/// `subscribe`, possibly before the caller has seen the returned handle,
/// so implementations carry their own staleness token rather than
/// comparing handles.
pub trait UpdateObserver: Send + Sync {
    /// Called with the initial snapshot and after every remote mutation.
    fn on_update(&self, children: Children);

    /// Called when the subscription fails; no further updates follow
    /// until re-subscribed.
    fn on_error(&self, error: RemoteError);
}

/// A path-addressable, child-structured remote database.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (a realtime database client, an in-memory store for
/// tests, etc.). All operations are asynchronous: they return
/// immediately and report through callbacks that may run on any thread.
pub trait RemoteStore: Send + Sync {
    /// Reads the children of a node once.
    fn fetch_once(&self, path: &PrefPath, callback: FetchCallback);

    /// Opens a live subscription on a node.
    ///
    /// Delivers an initial snapshot immediately, then one update per
    /// remote mutation, until unsubscribed.
    fn subscribe(&self, path: &PrefPath, observer: Arc<dyn UpdateObserver>) -> SubscriptionHandle;

    /// Closes a live subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Applies a partial write to a node's children.
    ///
    /// The update succeeds or fails as a unit from the caller's point of
    /// view.
    fn push_partial(&self, path: &PrefPath, update: ChildUpdate, callback: PushCallback);
}

/// Convenience observer that funnels updates into closures.
///
/// Useful in tests and small hosts that do not want a dedicated observer
/// type.
pub struct FnObserver<U, E>
where
    U: Fn(Children) + Send + Sync,
    E: Fn(RemoteError) + Send + Sync,
{
    on_update: U,
    on_error: E,
}

impl<U, E> FnObserver<U, E>
where
    U: Fn(Children) + Send + Sync,
    E: Fn(RemoteError) + Send + Sync,
{
    /// Creates an observer from an update closure and an error closure.
    pub fn new(on_update: U, on_error: E) -> Self {
        Self {
            on_update,
            on_error,
        }
    }
}

impl<U, E> UpdateObserver for FnObserver<U, E>
where
    U: Fn(Children) + Send + Sync,
    E: Fn(RemoteError) + Send + Sync,
{
    fn on_update(&self, children: Children) {
        (self.on_update)(children);
    }

    fn on_error(&self, error: RemoteError) {
        (self.on_error)(error);
    }
}
