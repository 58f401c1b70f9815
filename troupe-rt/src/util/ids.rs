// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Hierarchical actor identifier.
///
/// An id is a path string: the root segment names a top-level actor,
/// children are appended as `parent/child`. Ids are unique within a running
/// system; the id of a stopped actor may be reused.
///
/// Cloning is cheap (shared `Arc<str>` storage).
///
/// # Example
/// ```rust
/// use troupe_rt::util::ActorId;
///
/// let parent = ActorId::from("workers");
/// let child = parent.child("0");
/// assert_eq!(child.as_str(), "workers/0");
/// assert_eq!(child.parent(), Some(parent));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(Arc<str>);

impl ActorId {
    /// Create an id from a path string.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    /// Append a child segment, producing `self/segment`.
    pub fn child(&self, segment: &str) -> Self {
        Self(Arc::from(format!("{}/{}", self.0, segment)))
    }

    /// The parent id, obtained by splitting at the last `/`.
    ///
    /// Returns `None` for top-level ids.
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once('/').map(|(parent, _)| Self::new(parent))
    }

    /// The final path segment.
    pub fn name(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(_, name)| name)
    }

    /// The full path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ActorId {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
