//! Configuration for the preferences store.

/// Configuration shared by every instance created through one registry.
#[derive(Debug, Clone)]
pub struct PrefsConfig {
    /// Root segment of every remote path.
    pub root: String,
    /// Whether a commit pushes its diff to the remote store.
    ///
    /// Disabling this turns instances into read-only mirrors: commits
    /// still apply locally and notify, but nothing leaves the device
    /// except an explicit `push()`.
    pub push_on_commit: bool,
}

impl PrefsConfig {
    /// Creates a configuration with the given remote root.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            push_on_commit: true,
        }
    }

    /// Sets the remote root segment.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets whether commits push their diff.
    pub fn with_push_on_commit(mut self, push: bool) -> Self {
        self.push_on_commit = push;
        self
    }
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self::new("shared_prefs")
    }
}
