//! Canonical containment paths and expansion trace paths.

use std::fmt;

/// Containment-derived address of an object.
///
/// Roots render as `/<ClassName>[<root index>]`; every contained object
/// appends `/<feature>[<slot index>]` to its parent's path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    pub fn root(class_name: &str, index: usize) -> Self {
        Self(format!("/{class_name}[{index}]"))
    }

    pub fn child(&self, feature: &str, index: usize) -> Self {
        Self(format!("{}/{feature}[{index}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of containment steps below the root.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count().saturating_sub(1)
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Slash-joined trail of labels or identifiers from an expansion start node.
///
/// Segments may be empty (objects without a display name), so trace paths
/// are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TracePath(String);

impl TracePath {
    pub fn start(segment: &str) -> Self {
        Self(segment.to_string())
    }

    pub fn extend(&self, segment: &str) -> Self {
        Self(format!("{}/{segment}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TracePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
