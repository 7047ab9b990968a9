//! Error types for remote store operations.

use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a remote store.
///
/// These surface through fetch/push callbacks and subscription observers,
/// never through unrelated call paths. `Clone` lets a single outcome be
/// delivered to every caller waiting on a shared operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// No connection to the remote store.
    #[error("remote store disconnected")]
    Disconnected,

    /// The caller is not allowed to access the path.
    #[error("permission denied for {path}")]
    PermissionDenied {
        /// The remote path that was denied.
        path: String,
    },

    /// The remote payload could not be read.
    #[error("malformed payload: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },

    /// The remote store rejected the request for another reason.
    #[error("remote store unavailable: {message}")]
    Unavailable {
        /// Description of the problem.
        message: String,
    },
}

impl RemoteError {
    /// Creates a malformed-payload error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a permission-denied error for a path.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            RemoteError::Disconnected.to_string(),
            "remote store disconnected"
        );
        assert!(RemoteError::permission_denied("/prefs/u1/app")
            .to_string()
            .contains("/prefs/u1/app"));
    }
}
