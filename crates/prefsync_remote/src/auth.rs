//! Caller identity abstraction.

use parking_lot::RwLock;

/// Supplies the stable identity of the current caller.
///
/// The registry resolves an identity once per instance creation; `None`
/// means no caller is authenticated and instance creation must fail.
pub trait AuthProvider: Send + Sync {
    /// Returns the current caller identity, if any.
    fn current_identity(&self) -> Option<String>;
}

/// An auth provider backed by a settable identity.
///
/// Suitable for hosts that resolve authentication elsewhere and for
/// tests that need to simulate sign-in, sign-out, and identity switches.
#[derive(Debug, Default)]
pub struct StaticAuth {
    identity: RwLock<Option<String>>,
}

impl StaticAuth {
    /// Creates a provider with no signed-in identity.
    pub fn signed_out() -> Self {
        Self {
            identity: RwLock::new(None),
        }
    }

    /// Creates a provider with a fixed identity.
    pub fn signed_in(identity: impl Into<String>) -> Self {
        Self {
            identity: RwLock::new(Some(identity.into())),
        }
    }

    /// Replaces the current identity.
    pub fn set_identity(&self, identity: Option<String>) {
        *self.identity.write() = identity;
    }
}

impl AuthProvider for StaticAuth {
    fn current_identity(&self) -> Option<String> {
        self.identity.read().clone()
    }
}
