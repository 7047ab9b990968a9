//! The synchronized preferences store and its sync engine.
//!
//! One instance owns an in-memory cache that is the single source of
//! truth for synchronous reads, lazily populated from the remote store
//! and kept current by commits, explicit pulls, and an optional live
//! subscription. Remote-originated snapshots replace the cache wholesale
//! (remote is authoritative at load time); local commits apply diffs;
//! change notification is always diff-based, one event per touched key.

use crate::cache::LocalCache;
use crate::config::PrefsConfig;
use crate::diff::{diff, ChangeKind, KeyChange};
use crate::editor::{resolve, EditOp, Editor};
use crate::error::{PrefsError, PrefsResult};
use crate::feed::{ChangeFeed, KeyChangeEvent};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use prefsync_codec::{decode, encode, PrefValue};
use prefsync_remote::{
    ChildUpdate, Children, PrefPath, RemoteError, RemoteResult, RemoteStore, SubscriptionHandle,
    UpdateObserver,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Completion callback for pull and push operations.
pub type CompletionCallback = Box<dyn FnOnce(PrefsResult<()>) + Send>;

/// Cache population state of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    /// No snapshot has been applied yet.
    Unloaded,
    /// A fetch is in flight; readers wait for it.
    Loading,
    /// The cache holds a remote snapshot.
    Loaded,
}

/// State guarded by the instance's single mutual-exclusion domain.
struct EngineState {
    cache: LocalCache,
    load: LoadState,
    /// Incremented for every started fetch; a result arriving for an
    /// older generation is discarded.
    fetch_generation: u64,
    /// Outcome of the most recently finished fetch, keyed by generation
    /// so waiters can tell whose load completed.
    last_outcome: Option<(u64, PrefsResult<()>)>,
    /// Pull callbacks joining whichever fetch completes next.
    pending_pulls: Vec<CompletionCallback>,
    sync_on: bool,
    /// Incremented on every subscribe/unsubscribe; deliveries from a
    /// superseded subscription are discarded.
    sub_epoch: u64,
    subscription: Option<SubscriptionHandle>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            cache: LocalCache::new(),
            load: LoadState::Unloaded,
            fetch_generation: 0,
            last_outcome: None,
            pending_pulls: Vec::new(),
            sync_on: false,
            sub_epoch: 0,
            subscription: None,
        }
    }

    fn outcome_for(&self, generation: u64) -> Option<PrefsResult<()>> {
        self.last_outcome
            .as_ref()
            .filter(|(g, _)| *g == generation)
            .map(|(_, outcome)| outcome.clone())
    }
}

pub(crate) struct Inner {
    name: String,
    identity: String,
    path: PrefPath,
    remote: Arc<dyn RemoteStore>,
    push_on_commit: bool,
    state: Mutex<EngineState>,
    loaded_cond: Condvar,
    feed: ChangeFeed,
    omitted: RwLock<BTreeSet<String>>,
}

impl Inner {
    /// Blocks until the cache holds a snapshot, issuing at most one
    /// fetch regardless of how many callers arrive while it is in
    /// flight.
    fn ensure_loaded(self: &Arc<Self>) -> PrefsResult<()> {
        let mut state = self.state.lock();
        loop {
            match state.load {
                LoadState::Loaded => return Ok(()),
                LoadState::Loading => {
                    let generation = state.fetch_generation;
                    self.loaded_cond.wait(&mut state);
                    if let Some(outcome) = state.outcome_for(generation) {
                        return outcome;
                    }
                    // Spurious wakeup or a superseded load finished;
                    // re-examine the state.
                }
                LoadState::Unloaded => {
                    state.load = LoadState::Loading;
                    state.fetch_generation += 1;
                    let generation = state.fetch_generation;
                    MutexGuard::unlocked(&mut state, || self.start_fetch(generation));
                    if let Some(outcome) = state.outcome_for(generation) {
                        return outcome;
                    }
                }
            }
        }
    }

    fn start_fetch(self: &Arc<Self>, generation: u64) {
        debug!(path = %self.path, generation, "fetching remote snapshot");
        let weak = Arc::downgrade(self);
        self.remote.fetch_once(
            &self.path,
            Box::new(move |result| {
                if let Some(inner) = weak.upgrade() {
                    inner.finish_fetch(generation, result);
                }
            }),
        );
    }

    /// Applies a finished fetch: replace-all on success, regress to
    /// `Unloaded` on a failed initial load, wake waiters either way.
    fn finish_fetch(&self, generation: u64, result: RemoteResult<Children>) {
        let (outcome, changes, callbacks) = {
            let mut state = self.state.lock();
            if state.fetch_generation != generation {
                debug!(path = %self.path, generation, "discarding superseded fetch result");
                return;
            }
            let (outcome, changes) = match result {
                Ok(children) => {
                    let decoded = self.decode_children(&children);
                    let before = state.cache.snapshot();
                    state.cache.replace_all(decoded);
                    let changes = diff(&before, &state.cache.snapshot());
                    state.load = LoadState::Loaded;
                    info!(path = %self.path, keys = state.cache.len(), "pull succeeded");
                    (Ok(()), changes)
                }
                Err(remote_error) => {
                    error!(path = %self.path, error = %remote_error, "pull failed");
                    if state.load != LoadState::Loaded {
                        state.load = LoadState::Unloaded;
                    }
                    (Err(PrefsError::Remote(remote_error)), Vec::new())
                }
            };
            state.last_outcome = Some((generation, outcome.clone()));
            let callbacks = std::mem::take(&mut state.pending_pulls);
            self.loaded_cond.notify_all();
            (outcome, changes, callbacks)
        };
        self.feed.emit_batch(changes);
        for callback in callbacks {
            callback(outcome.clone());
        }
    }

    fn decode_children(&self, children: &Children) -> BTreeMap<String, PrefValue> {
        let mut decoded = BTreeMap::new();
        for (key, value) in children {
            match decode(value) {
                Ok(v) => {
                    decoded.insert(key.clone(), v);
                }
                Err(codec_error) => {
                    warn!(
                        path = %self.path,
                        key = %key,
                        error = %codec_error,
                        "skipping undecodable child"
                    );
                }
            }
        }
        decoded
    }

    /// One-shot refresh. Joins the in-flight load if one exists instead
    /// of issuing a second fetch.
    fn pull(self: &Arc<Self>, callback: CompletionCallback) {
        let generation = {
            let mut state = self.state.lock();
            state.pending_pulls.push(callback);
            if state.load == LoadState::Loading {
                return;
            }
            if state.load == LoadState::Unloaded {
                state.load = LoadState::Loading;
            }
            state.fetch_generation += 1;
            state.fetch_generation
        };
        self.start_fetch(generation);
    }

    /// Applies an editor's staged operations: resolve over the base
    /// snapshot, diff against the current cache, apply locally, notify
    /// per key, then push the diff.
    pub(crate) fn commit_edit(&self, base: &BTreeMap<String, PrefValue>, ops: &[EditOp]) -> bool {
        let target = resolve(base, ops);
        let (changes, update) = {
            let mut state = self.state.lock();
            let before = state.cache.snapshot();
            let changes = diff(&before, &target);

            let mut removed = BTreeSet::new();
            let mut changed = BTreeMap::new();
            for change in &changes {
                match change.kind {
                    ChangeKind::Removed => {
                        removed.insert(change.key.clone());
                    }
                    ChangeKind::Added | ChangeKind::Updated => {
                        if let Some(value) = target.get(&change.key) {
                            changed.insert(change.key.clone(), value.clone());
                        }
                    }
                }
            }
            state.cache.apply_diff(&removed, changed);

            let update = self.build_update(&changes, &target);
            (changes, update)
        };

        debug!(path = %self.path, changed = changes.len(), "commit applied");
        self.feed.emit_batch(changes);

        if self.push_on_commit && !update.is_empty() {
            self.push_update(update, None);
        }
        true
    }

    /// Builds the partial write for a set of changes, skipping omitted
    /// keys.
    fn build_update(&self, changes: &[KeyChange], target: &BTreeMap<String, PrefValue>) -> ChildUpdate {
        let omitted = self.omitted.read();
        let mut update = ChildUpdate::new();
        for change in changes {
            if omitted.contains(&change.key) {
                continue;
            }
            match change.kind {
                ChangeKind::Removed => {
                    update.insert(change.key.clone(), None);
                }
                ChangeKind::Added | ChangeKind::Updated => {
                    if let Some(value) = target.get(&change.key) {
                        update.insert(change.key.clone(), Some(encode(value)));
                    }
                }
            }
        }
        update
    }

    /// Fires a partial write; the outcome is logged and, if present,
    /// forwarded to a callback. A failed push never rolls back the
    /// cache.
    fn push_update(&self, update: ChildUpdate, callback: Option<CompletionCallback>) {
        let path = self.path.clone();
        self.remote.push_partial(
            &self.path,
            update,
            Box::new(move |result| {
                match &result {
                    Ok(()) => info!(path = %path, "push succeeded"),
                    Err(remote_error) => {
                        error!(path = %path, error = %remote_error, "push failed")
                    }
                }
                if let Some(callback) = callback {
                    callback(result.map_err(PrefsError::Remote));
                }
            }),
        );
    }

    /// One-shot upload of the entire resident cache, minus omitted keys.
    fn push_all(&self, callback: CompletionCallback) {
        let snapshot = self.state.lock().cache.snapshot();
        let update = {
            let omitted = self.omitted.read();
            snapshot
                .iter()
                .filter(|(key, _)| !omitted.contains(*key))
                .map(|(key, value)| (key.clone(), Some(encode(value))))
                .collect::<ChildUpdate>()
        };
        self.push_update(update, Some(callback));
    }

    fn set_sync_enabled(self: &Arc<Self>, enabled: bool) {
        if enabled {
            let epoch = {
                let mut state = self.state.lock();
                if state.sync_on {
                    debug!(path = %self.path, "live sync already enabled");
                    return;
                }
                state.sync_on = true;
                state.sub_epoch += 1;
                state.sub_epoch
            };
            let observer = Arc::new(LiveSyncObserver {
                inner: Arc::downgrade(self),
                epoch,
            });
            info!(path = %self.path, "enabling live sync");
            let handle = self.remote.subscribe(&self.path, observer);
            let mut state = self.state.lock();
            if state.sync_on && state.sub_epoch == epoch {
                state.subscription = Some(handle);
            } else {
                // Toggled off while subscribing.
                drop(state);
                self.remote.unsubscribe(handle);
            }
        } else {
            let handle = {
                let mut state = self.state.lock();
                if !state.sync_on {
                    return;
                }
                state.sync_on = false;
                state.sub_epoch += 1;
                state.subscription.take()
            };
            info!(path = %self.path, "disabling live sync");
            if let Some(handle) = handle {
                self.remote.unsubscribe(handle);
            }
        }
    }

    /// Applies a live-subscription snapshot: wholesale replace, diff
    /// notification, and completion of any waiting loaders.
    fn apply_live_snapshot(&self, epoch: u64, children: Children) {
        let (changes, callbacks) = {
            let mut state = self.state.lock();
            if state.sub_epoch != epoch {
                debug!(path = %self.path, "discarding update from a superseded subscription");
                return;
            }
            let decoded = self.decode_children(&children);
            let before = state.cache.snapshot();
            state.cache.replace_all(decoded);
            let changes = diff(&before, &state.cache.snapshot());
            state.load = LoadState::Loaded;
            state.last_outcome = Some((state.fetch_generation, Ok(())));
            let callbacks = std::mem::take(&mut state.pending_pulls);
            self.loaded_cond.notify_all();
            (changes, callbacks)
        };
        debug!(path = %self.path, changed = changes.len(), "applied live snapshot");
        self.feed.emit_batch(changes);
        for callback in callbacks {
            callback(Ok(()));
        }
    }

    fn try_get(self: &Arc<Self>, key: &str) -> PrefsResult<Option<PrefValue>> {
        self.ensure_loaded()?;
        Ok(self.state.lock().cache.get(key).cloned())
    }
}

struct LiveSyncObserver {
    inner: Weak<Inner>,
    epoch: u64,
}

impl UpdateObserver for LiveSyncObserver {
    fn on_update(&self, children: Children) {
        if let Some(inner) = self.inner.upgrade() {
            inner.apply_live_snapshot(self.epoch, children);
        }
    }

    fn on_error(&self, remote_error: RemoteError) {
        if let Some(inner) = self.inner.upgrade() {
            error!(path = %inner.path, error = %remote_error, "live sync failed");
        }
    }
}

/// A synchronized preferences instance.
///
/// Cloning yields another shared handle onto the same instance; the
/// registry owns the canonical handle.
#[derive(Clone)]
pub struct SyncedPrefs {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SyncedPrefs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedPrefs")
            .field("name", &self.inner.name)
            .field("identity", &self.inner.identity)
            .finish_non_exhaustive()
    }
}

impl SyncedPrefs {
    pub(crate) fn create(
        name: impl Into<String>,
        identity: impl Into<String>,
        path: PrefPath,
        remote: Arc<dyn RemoteStore>,
        config: &PrefsConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                identity: identity.into(),
                path,
                remote,
                push_on_commit: config.push_on_commit,
                state: Mutex::new(EngineState::new()),
                loaded_cond: Condvar::new(),
                feed: ChangeFeed::new(),
                omitted: RwLock::new(BTreeSet::new()),
            }),
        }
    }

    /// The logical store name this instance was created under.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The caller identity this instance is bound to.
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    /// The remote path this instance syncs against.
    pub fn path(&self) -> &PrefPath {
        &self.inner.path
    }

    /// Returns the typed value stored under a key, loading the cache
    /// first if needed. A failed load surfaces as `Err`.
    pub fn try_get(&self, key: &str) -> PrefsResult<Option<PrefValue>> {
        self.inner.try_get(key)
    }

    /// Returns the full mapping, loading the cache first if needed.
    pub fn try_get_all(&self) -> PrefsResult<BTreeMap<String, PrefValue>> {
        self.inner.ensure_loaded()?;
        Ok(self.inner.state.lock().cache.snapshot())
    }

    /// Returns whether a key is present, loading the cache first if
    /// needed.
    pub fn try_contains(&self, key: &str) -> PrefsResult<bool> {
        self.inner.ensure_loaded()?;
        Ok(self.inner.state.lock().cache.contains(key))
    }

    fn read_value(&self, key: &str) -> Option<PrefValue> {
        match self.inner.try_get(key) {
            Ok(value) => value,
            Err(prefs_error) => {
                warn!(
                    path = %self.inner.path,
                    key,
                    error = %prefs_error,
                    "load failed, read serves the caller default"
                );
                None
            }
        }
    }

    /// Returns the string under `key`, or `default` if the key is
    /// absent, of another type, or the cache could not be loaded.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.read_value(key) {
            Some(PrefValue::Text(s)) => s,
            _ => default.to_string(),
        }
    }

    /// Returns the long under `key`, or `default`.
    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        match self.read_value(key) {
            Some(PrefValue::Long(n)) => n,
            _ => default,
        }
    }

    /// Returns the int under `key`, or `default`.
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        match self.read_value(key) {
            Some(PrefValue::Int(n)) => n,
            _ => default,
        }
    }

    /// Returns the float under `key`, or `default`.
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        match self.read_value(key) {
            Some(PrefValue::Float(f)) => f,
            _ => default,
        }
    }

    /// Returns the boolean under `key`, or `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.read_value(key) {
            Some(PrefValue::Bool(b)) => b,
            _ => default,
        }
    }

    /// Returns the string-set under `key`, or `default`.
    pub fn get_string_set(&self, key: &str, default: BTreeSet<String>) -> BTreeSet<String> {
        match self.read_value(key) {
            Some(PrefValue::StringSet(s)) => s,
            _ => default,
        }
    }

    /// Returns the full mapping, or an empty one if the cache could not
    /// be loaded.
    pub fn get_all(&self) -> BTreeMap<String, PrefValue> {
        self.try_get_all().unwrap_or_default()
    }

    /// Returns whether a key is present; `false` if the cache could not
    /// be loaded.
    pub fn contains(&self, key: &str) -> bool {
        self.try_contains(key).unwrap_or(false)
    }

    /// Opens an editor over a snapshot of the current cache.
    pub fn edit(&self) -> Editor {
        if let Err(prefs_error) = self.inner.ensure_loaded() {
            warn!(
                path = %self.inner.path,
                error = %prefs_error,
                "editing over an unloaded cache"
            );
        }
        let base = self.inner.state.lock().cache.snapshot();
        Editor::new(Arc::clone(&self.inner), base)
    }

    /// Subscribes to per-key change events. Dropping the receiver
    /// unsubscribes.
    pub fn watch(&self) -> Receiver<KeyChangeEvent> {
        self.inner.feed.subscribe()
    }

    /// Fetches the latest remote snapshot, replacing the cache on
    /// success. Concurrent pulls share one fetch.
    pub fn pull<F>(&self, on_complete: F)
    where
        F: FnOnce(PrefsResult<()>) + Send + 'static,
    {
        self.inner.pull(Box::new(on_complete));
    }

    /// Uploads the entire resident cache, minus omitted keys.
    pub fn push<F>(&self, on_complete: F)
    where
        F: FnOnce(PrefsResult<()>) + Send + 'static,
    {
        self.inner.push_all(Box::new(on_complete));
    }

    /// Toggles live sync. Enabling twice keeps the single existing
    /// subscription.
    pub fn set_sync_enabled(&self, enabled: bool) {
        self.inner.set_sync_enabled(enabled);
    }

    /// Returns whether live sync is on.
    pub fn is_sync_enabled(&self) -> bool {
        self.inner.state.lock().sync_on
    }

    /// Excludes keys from every future push. Commits still apply such
    /// keys locally; they just never leave the device.
    pub fn omit_keys<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut omitted = self.inner.omitted.write();
        for key in keys {
            omitted.insert(key.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PrefsRegistry;
    use prefsync_codec::RemoteValue;
    use prefsync_remote::{MemoryRemoteStore, StaticAuth};
    use std::sync::mpsc::TryRecvError;
    use std::thread;
    use std::time::{Duration, Instant};

    fn setup() -> (Arc<MemoryRemoteStore>, SyncedPrefs) {
        setup_with(PrefsConfig::default())
    }

    fn setup_with(config: PrefsConfig) -> (Arc<MemoryRemoteStore>, SyncedPrefs) {
        let store = Arc::new(MemoryRemoteStore::new());
        let registry = PrefsRegistry::new(
            Arc::new(StaticAuth::signed_in("user-1")),
            Arc::clone(&store) as Arc<dyn RemoteStore>,
            config,
        );
        let prefs = registry.instance("settings").unwrap();
        (store, prefs)
    }

    fn seed(store: &MemoryRemoteStore, prefs: &SyncedPrefs, pairs: &[(&str, RemoteValue)]) {
        let children: Children = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        store.set_children(prefs.path(), children);
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn first_read_populates_cache_lazily() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("theme", RemoteValue::Text("dark".into()))]);
        assert_eq!(store.fetch_count(), 0);

        assert_eq!(prefs.get_string("theme", "light"), "dark");
        assert_eq!(store.fetch_count(), 1);

        // Subsequent reads are served from the cache.
        assert_eq!(prefs.get_string("theme", "light"), "dark");
        assert!(prefs.contains("theme"));
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn typed_reads_fall_back_to_defaults() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("count", RemoteValue::Long(7))]);

        assert_eq!(prefs.get_long("count", -1), 7);
        // Wrong accessor for the stored type.
        assert_eq!(prefs.get_string("count", "fallback"), "fallback");
        assert_eq!(prefs.get_int("count", -1), -1);
        // Absent key.
        assert_eq!(prefs.get_bool("missing", true), true);
    }

    #[test]
    fn commit_is_visible_before_push_resolves() {
        let (store, prefs) = setup();
        // Load an empty snapshot, then take the network away so the push
        // cannot confirm.
        assert_eq!(prefs.get_all().len(), 0);
        store.set_connected(false);

        assert!(prefs.edit().put_string("k", "v").commit());
        assert_eq!(prefs.get_string("k", ""), "v");

        // The push failed; local state is untouched and remote is empty.
        assert!(store.children(prefs.path()).is_empty());
        assert_eq!(prefs.get_string("k", ""), "v");
    }

    #[test]
    fn commit_pushes_diff_including_deletions() {
        let (store, prefs) = setup();
        seed(
            &store,
            &prefs,
            &[
                ("keep", RemoteValue::Long(1)),
                ("drop", RemoteValue::Long(2)),
            ],
        );

        assert!(prefs
            .edit()
            .put_long("keep", 10)
            .remove("drop")
            .put_bool("fresh", true)
            .commit());

        let children = store.children(prefs.path());
        assert_eq!(children.get("keep"), Some(&RemoteValue::Long(10)));
        assert_eq!(children.get("fresh"), Some(&RemoteValue::Bool(true)));
        assert!(!children.contains_key("drop"));
    }

    #[test]
    fn notification_is_per_changed_key() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("a", RemoteValue::Long(1))]);
        assert_eq!(prefs.get_long("a", 0), 1);

        let rx = prefs.watch();
        assert!(prefs.edit().put_long("a", 1).put_long("b", 2).commit());

        let event = rx.recv_timeout(Duration::from_millis(200)).unwrap();
        assert_eq!(event.key, "b");
        assert_eq!(event.kind, ChangeKind::Added);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn clear_then_put_leaves_put_key_present() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("old", RemoteValue::Long(1))]);
        assert_eq!(prefs.get_long("old", 0), 1);

        assert!(prefs.edit().clear().put_string("k", "v").commit());

        assert_eq!(prefs.get_string("k", ""), "v");
        assert!(!prefs.contains("old"));
        let children = store.children(prefs.path());
        assert_eq!(children.get("k"), Some(&RemoteValue::Text("v".into())));
        assert!(!children.contains_key("old"));
    }

    #[test]
    fn apply_commits_in_background() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[]);

        prefs.edit().put_string("k", "v").apply();
        wait_until(|| prefs.get_string("k", "") == "v");
        wait_until(|| !store.children(prefs.path()).is_empty());
    }

    #[test]
    fn pull_replaces_stale_local_keys() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("a", RemoteValue::Long(1))]);
        assert_eq!(prefs.get_long("a", 0), 1);

        // A local-only key that the remote never saw.
        store.set_connected(false);
        assert!(prefs.edit().put_long("local_only", 9).commit());
        store.set_connected(true);

        seed(&store, &prefs, &[("b", RemoteValue::Long(2))]);
        prefs.pull(|outcome| outcome.unwrap());

        let all = prefs.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("b"), Some(&PrefValue::Long(2)));
        assert!(!all.contains_key("a"));
        assert!(!all.contains_key("local_only"));
    }

    #[test]
    fn failed_load_surfaces_and_is_retryable() {
        let (store, prefs) = setup();
        store.set_connected(false);

        assert_eq!(
            prefs.try_get("k").unwrap_err(),
            PrefsError::Remote(RemoteError::Disconnected)
        );
        // The platform-shaped getter serves the default instead.
        assert_eq!(prefs.get_string("k", "default"), "default");

        store.set_connected(true);
        seed(&store, &prefs, &[("k", RemoteValue::Text("v".into()))]);
        assert_eq!(prefs.try_get("k").unwrap(), Some(PrefValue::Text("v".into())));
    }

    #[test]
    fn concurrent_reads_share_one_fetch() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("count", RemoteValue::Long(7))]);
        store.hold_fetches();

        let mut readers = Vec::new();
        for _ in 0..4 {
            let prefs = prefs.clone();
            readers.push(thread::spawn(move || prefs.get_long("count", -1)));
        }

        // All readers funnel into the single held fetch.
        wait_until(|| store.fetch_count() == 1);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(store.fetch_count(), 1);

        store.release_fetches();
        for reader in readers {
            assert_eq!(reader.join().unwrap(), 7);
        }
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn concurrent_pulls_join_one_fetch() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("k", RemoteValue::Long(1))]);
        store.hold_fetches();

        let first = Arc::new(Mutex::new(None));
        let second = Arc::new(Mutex::new(None));
        let first2 = Arc::clone(&first);
        let second2 = Arc::clone(&second);
        prefs.pull(move |outcome| *first2.lock() = Some(outcome));
        prefs.pull(move |outcome| *second2.lock() = Some(outcome));

        assert_eq!(store.fetch_count(), 1);
        store.release_fetches();

        assert_eq!(first.lock().take().unwrap(), Ok(()));
        assert_eq!(second.lock().take().unwrap(), Ok(()));
        assert_eq!(prefs.get_long("k", 0), 1);
    }

    #[test]
    fn superseded_fetch_result_is_discarded() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("k", RemoteValue::Long(1))]);
        assert_eq!(prefs.get_long("k", 0), 1);

        // Two refresh pulls on a loaded instance race; only the newest
        // generation may apply.
        store.hold_fetches();
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let outcomes = Arc::clone(&outcomes);
            prefs.pull(move |outcome| outcomes.lock().push(outcome));
        }
        assert_eq!(store.fetch_count(), 3);

        seed(&store, &prefs, &[("k", RemoteValue::Long(2))]);
        store.release_fetches();

        assert_eq!(*outcomes.lock(), vec![Ok(()), Ok(())]);
        assert_eq!(prefs.get_long("k", 0), 2);
    }

    #[test]
    fn enabling_sync_twice_keeps_one_subscription() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("k", RemoteValue::Long(1))]);

        let rx = prefs.watch();
        prefs.set_sync_enabled(true);
        assert!(prefs.is_sync_enabled());
        assert_eq!(store.subscriber_count(), 1);

        // One initial snapshot: one Added event for the seeded key.
        assert_eq!(rx.recv_timeout(Duration::from_millis(200)).unwrap().key, "k");

        prefs.set_sync_enabled(true);
        assert_eq!(store.subscriber_count(), 1);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn live_sync_applies_remote_changes_until_disabled() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[]);
        prefs.set_sync_enabled(true);

        seed(&store, &prefs, &[("theme", RemoteValue::Text("dark".into()))]);
        assert_eq!(prefs.get_string("theme", "light"), "dark");

        prefs.set_sync_enabled(false);
        assert!(!prefs.is_sync_enabled());
        assert_eq!(store.subscriber_count(), 0);

        seed(&store, &prefs, &[("theme", RemoteValue::Text("blue".into()))]);
        assert_eq!(prefs.get_string("theme", "light"), "dark");
    }

    #[test]
    fn live_snapshot_wakes_waiting_loaders() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[("k", RemoteValue::Long(5))]);
        store.hold_fetches();

        let reader = {
            let prefs = prefs.clone();
            thread::spawn(move || prefs.get_long("k", -1))
        };
        wait_until(|| store.fetch_count() == 1);

        // The subscription's initial snapshot populates the cache while
        // the fetch is still held.
        prefs.set_sync_enabled(true);
        assert_eq!(reader.join().unwrap(), 5);

        store.release_fetches();
    }

    #[test]
    fn undecodable_child_is_skipped_not_fatal() {
        let (store, prefs) = setup();
        seed(
            &store,
            &prefs,
            &[
                ("good", RemoteValue::Long(1)),
                (
                    "bad",
                    RemoteValue::List(vec![RemoteValue::Text("x".into()), RemoteValue::Long(2)]),
                ),
            ],
        );

        let all = prefs.get_all();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("good"));
        assert!(!all.contains_key("bad"));
    }

    #[test]
    fn omitted_keys_never_leave_the_device() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[]);
        prefs.omit_keys(["secret"]);

        assert!(prefs
            .edit()
            .put_string("secret", "hunter2")
            .put_string("visible", "ok")
            .commit());

        // Readable locally, absent from the partial push.
        assert_eq!(prefs.get_string("secret", ""), "hunter2");
        let children = store.children(prefs.path());
        assert!(!children.contains_key("secret"));
        assert!(children.contains_key("visible"));

        // Absent from a full push too.
        prefs.push(|outcome| outcome.unwrap());
        assert!(!store.children(prefs.path()).contains_key("secret"));
    }

    #[test]
    fn string_set_roundtrips_through_commit_and_pull() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[]);

        let tags: BTreeSet<String> = ["beta".to_string(), "alpha".to_string()]
            .into_iter()
            .collect();
        assert!(prefs.edit().put_string_set("tags", tags.clone()).commit());

        // Re-load from the remote representation.
        prefs.pull(|outcome| outcome.unwrap());
        assert_eq!(prefs.get_string_set("tags", BTreeSet::new()), tags);
    }

    #[test]
    fn push_uploads_entire_cache() {
        let (store, prefs) = setup_with(PrefsConfig::default().with_push_on_commit(false));
        seed(&store, &prefs, &[]);

        assert!(prefs.edit().put_long("a", 1).put_long("b", 2).commit());
        assert!(store.children(prefs.path()).is_empty());

        prefs.push(|outcome| outcome.unwrap());
        let children = store.children(prefs.path());
        assert_eq!(children.get("a"), Some(&RemoteValue::Long(1)));
        assert_eq!(children.get("b"), Some(&RemoteValue::Long(2)));
    }

    #[test]
    fn push_failure_reports_through_callback() {
        let (store, prefs) = setup();
        seed(&store, &prefs, &[]);
        assert!(prefs.edit().put_long("k", 1).commit());

        store.set_connected(false);
        let outcome = Arc::new(Mutex::new(None));
        let outcome2 = Arc::clone(&outcome);
        prefs.push(move |result| *outcome2.lock() = Some(result));

        assert_eq!(
            outcome.lock().take().unwrap(),
            Err(PrefsError::Remote(RemoteError::Disconnected))
        );
        // Local state is untouched.
        assert_eq!(prefs.get_long("k", 0), 1);
    }
}
