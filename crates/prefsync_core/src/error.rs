//! Error types for the preferences store.

use prefsync_remote::RemoteError;
use thiserror::Error;

/// Result type for preferences operations.
pub type PrefsResult<T> = Result<T, PrefsError>;

/// Errors surfaced by the preferences store.
///
/// `Clone` lets one load outcome be handed to every caller that waited on
/// the same in-flight load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrefsError {
    /// No authenticated caller; instance creation cannot proceed.
    #[error("no identity available from the auth provider")]
    IdentityMissing,

    /// A remote operation failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_convert() {
        let err: PrefsError = RemoteError::Disconnected.into();
        assert_eq!(err, PrefsError::Remote(RemoteError::Disconnected));
    }

    #[test]
    fn error_display() {
        assert!(PrefsError::IdentityMissing.to_string().contains("identity"));
    }
}
