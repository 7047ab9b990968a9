//! In-memory remote store for tests and local use.

use crate::error::RemoteError;
use crate::path::PrefPath;
use crate::store::{
    Children, ChildUpdate, FetchCallback, PushCallback, RemoteStore, SubscriptionHandle,
    UpdateObserver,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct Subscriber {
    path: String,
    observer: Arc<dyn UpdateObserver>,
}

struct HeldFetch {
    path: String,
    callback: FetchCallback,
}

#[derive(Default)]
struct Inner {
    connected: bool,
    nodes: HashMap<String, Children>,
    denied: HashSet<String>,
    subscribers: HashMap<u64, Subscriber>,
    next_handle: u64,
    holding_fetches: bool,
    held_fetches: Vec<HeldFetch>,
    fetch_count: u64,
    push_count: u64,
}

impl Inner {
    fn fetch_result(&self, path: &str) -> Result<Children, RemoteError> {
        if !self.connected {
            return Err(RemoteError::Disconnected);
        }
        if self.denied.contains(path) {
            return Err(RemoteError::permission_denied(path));
        }
        Ok(self.nodes.get(path).cloned().unwrap_or_default())
    }
}

/// A fully functional in-memory [`RemoteStore`].
///
/// Backs tests and local development: per-path child maps, live
/// subscriber notification on every write, a connectivity toggle, per-path
/// permission denial, and fetch gating so a test can hold a load in
/// flight and observe waiting callers.
///
/// Callbacks are delivered synchronously on the calling thread; the
/// consumer contract treats them as arriving on an arbitrary thread
/// either way.
pub struct MemoryRemoteStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    /// Creates a connected, empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                connected: true,
                ..Inner::default()
            }),
        }
    }

    /// Replaces the children of a node and notifies its live
    /// subscribers, simulating a mutation made by another client.
    ///
    /// While disconnected the data still changes server-side, but no
    /// subscriber hears about it.
    pub fn set_children(&self, path: &PrefPath, children: Children) {
        let observers = {
            let mut inner = self.inner.lock();
            let key = path.to_string();
            inner.nodes.insert(key.clone(), children.clone());
            if inner.connected {
                collect_observers(&inner, &key)
            } else {
                Vec::new()
            }
        };
        for observer in observers {
            observer.on_update(children.clone());
        }
    }

    /// Returns the current children of a node.
    pub fn children(&self, path: &PrefPath) -> Children {
        self.inner
            .lock()
            .nodes
            .get(&path.to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// Toggles connectivity. While disconnected every operation fails
    /// with [`RemoteError::Disconnected`].
    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().connected = connected;
    }

    /// Marks a path as permission-denied.
    pub fn deny_path(&self, path: &PrefPath) {
        self.inner.lock().denied.insert(path.to_string());
    }

    /// Holds subsequent fetches instead of completing them, until
    /// [`release_fetches`](Self::release_fetches) is called.
    pub fn hold_fetches(&self) {
        self.inner.lock().holding_fetches = true;
    }

    /// Completes all held fetches against the current data and stops
    /// holding.
    pub fn release_fetches(&self) {
        let completions = {
            let mut inner = self.inner.lock();
            inner.holding_fetches = false;
            let held = std::mem::take(&mut inner.held_fetches);
            held.into_iter()
                .map(|f| {
                    let result = inner.fetch_result(&f.path);
                    (f.callback, result)
                })
                .collect::<Vec<_>>()
        };
        for (callback, result) in completions {
            callback(result);
        }
    }

    /// Number of fetches issued so far, held ones included.
    pub fn fetch_count(&self) -> u64 {
        self.inner.lock().fetch_count
    }

    /// Number of partial writes issued so far.
    pub fn push_count(&self) -> u64 {
        self.inner.lock().push_count
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

fn collect_observers(inner: &Inner, key: &str) -> Vec<Arc<dyn UpdateObserver>> {
    inner
        .subscribers
        .values()
        .filter(|s| s.path == key)
        .map(|s| Arc::clone(&s.observer))
        .collect()
}

impl RemoteStore for MemoryRemoteStore {
    fn fetch_once(&self, path: &PrefPath, callback: FetchCallback) {
        let key = path.to_string();
        let result = {
            let mut inner = self.inner.lock();
            inner.fetch_count += 1;
            if inner.holding_fetches {
                inner.held_fetches.push(HeldFetch {
                    path: key,
                    callback,
                });
                return;
            }
            inner.fetch_result(&key)
        };
        callback(result);
    }

    fn subscribe(&self, path: &PrefPath, observer: Arc<dyn UpdateObserver>) -> SubscriptionHandle {
        let key = path.to_string();
        let (handle, initial) = {
            let mut inner = self.inner.lock();
            let handle = SubscriptionHandle::new(inner.next_handle);
            inner.next_handle += 1;
            let initial = inner.fetch_result(&key);
            if initial.is_ok() {
                inner.subscribers.insert(
                    handle.id(),
                    Subscriber {
                        path: key,
                        observer: Arc::clone(&observer),
                    },
                );
            }
            (handle, initial)
        };
        match initial {
            Ok(children) => observer.on_update(children),
            Err(error) => observer.on_error(error),
        }
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.inner.lock().subscribers.remove(&handle.id());
    }

    fn push_partial(&self, path: &PrefPath, update: ChildUpdate, callback: PushCallback) {
        let key = path.to_string();
        let (result, notify) = {
            let mut inner = self.inner.lock();
            inner.push_count += 1;
            if !inner.connected {
                (Err(RemoteError::Disconnected), None)
            } else if inner.denied.contains(&key) {
                (Err(RemoteError::permission_denied(&key)), None)
            } else {
                let node = inner.nodes.entry(key.clone()).or_default();
                for (child, value) in update {
                    match value {
                        Some(v) => {
                            node.insert(child, v);
                        }
                        None => {
                            node.remove(&child);
                        }
                    }
                }
                let snapshot = node.clone();
                let observers = collect_observers(&inner, &key);
                (Ok(()), Some((snapshot, observers)))
            }
        };
        callback(result);
        if let Some((snapshot, observers)) = notify {
            for observer in observers {
                observer.on_update(snapshot.clone());
            }
        }
    }
}
