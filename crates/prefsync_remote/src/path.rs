//! Remote path layout and sanitization.

use std::fmt;

/// Characters that are structurally forbidden in hierarchical path
/// segments of the remote store.
const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

/// Replaces forbidden characters in a path segment with `-`.
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '-' } else { c })
        .collect()
}

/// The remote location of one preferences node:
/// `/{root}/{identity}/{name}`.
///
/// Segments are sanitized at construction, so a `PrefPath` is always a
/// valid remote reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefPath {
    root: String,
    identity: String,
    name: String,
}

impl PrefPath {
    /// Creates a path from a configurable root, a caller identity, and a
    /// preferences-store name.
    pub fn new(
        root: impl Into<String>,
        identity: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            root: sanitize_segment(&root.into()),
            identity: sanitize_segment(&identity.into()),
            name: sanitize_segment(&name.into()),
        }
    }

    /// The configured root segment.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The caller identity segment.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The sanitized preferences-store name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PrefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}/{}", self.root, self.identity, self.name)
    }
}
