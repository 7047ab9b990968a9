//! Instance registry.

use crate::config::PrefsConfig;
use crate::error::{PrefsError, PrefsResult};
use crate::store::SyncedPrefs;
use parking_lot::Mutex;
use prefsync_remote::{AuthProvider, PrefPath, RemoteStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Creates and caches preferences instances.
///
/// The registry is an explicit context object owned by the host; there is
/// no process-global state. Instances are keyed by **(identity, name)**,
/// so switching identity yields a distinct instance bound to its own
/// remote root instead of silently reusing the previous caller's cache.
/// The registry exclusively owns all instances; callers receive shared
/// handles.
pub struct PrefsRegistry {
    auth: Arc<dyn AuthProvider>,
    remote: Arc<dyn RemoteStore>,
    config: PrefsConfig,
    instances: Mutex<HashMap<(String, String), SyncedPrefs>>,
}

impl PrefsRegistry {
    /// Creates a registry over an auth provider and a remote store.
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        remote: Arc<dyn RemoteStore>,
        config: PrefsConfig,
    ) -> Self {
        Self {
            auth,
            remote,
            config,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the instance for `name` under the current identity,
    /// creating it on first use.
    ///
    /// Fails with [`PrefsError::IdentityMissing`] when the auth provider
    /// has no identity; that failure is not cached, so a later sign-in
    /// succeeds.
    pub fn instance(&self, name: &str) -> PrefsResult<SyncedPrefs> {
        let identity = self
            .auth
            .current_identity()
            .ok_or(PrefsError::IdentityMissing)?;

        let mut instances = self.instances.lock();
        let key = (identity.clone(), name.to_string());
        if let Some(prefs) = instances.get(&key) {
            return Ok(prefs.clone());
        }

        let path = PrefPath::new(&self.config.root, &identity, name);
        info!(path = %path, "creating preferences instance");
        let prefs = SyncedPrefs::create(
            name,
            identity,
            path,
            Arc::clone(&self.remote),
            &self.config,
        );
        instances.insert(key, prefs.clone());
        Ok(prefs)
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }
}
