use std::sync::Arc;

use crate::host::scene::SceneHost;

/// Identity of a host drawable.
///
/// A `SourceId` carries no ownership: it is only valid while somebody holds a reference to the
/// drawable (an [`OwnedSource`], the output slot, or the catalog during a query).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(pub u64);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag of a host drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Plain renderable input.
    Input,
    /// Transition object that proxies between two sources while animating.
    Transition,
}

/// A reference the host handed out with one count attached.
///
/// Host implementations return this from every acquiring call; callers turn it into an
/// [`OwnedSource`] so the count is given back exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "acquired references must be adopted into an OwnedSource or released"]
pub struct Acquired(SourceId);

impl Acquired {
    /// Mark `id` as carrying one reference owned by the receiver.
    pub fn new(id: SourceId) -> Self {
        Self(id)
    }

    /// Identity of the acquired drawable.
    pub fn id(&self) -> SourceId {
        self.0
    }
}

/// Counted reference to a host drawable, released on drop.
pub struct OwnedSource {
    id: SourceId,
    host: Arc<dyn SceneHost>,
}

impl OwnedSource {
    /// Take over the reference carried by `acquired`.
    pub fn adopt(host: Arc<dyn SceneHost>, acquired: Acquired) -> Self {
        Self {
            id: acquired.0,
            host,
        }
    }

    /// Identity of the drawable.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Host-side name of the drawable.
    pub fn name(&self) -> Option<String> {
        self.host.source_name(self.id)
    }

    /// Host-side type tag of the drawable.
    pub fn kind(&self) -> Option<SourceKind> {
        self.host.source_kind(self.id)
    }

    /// Whether the drawable is a transition object.
    pub fn is_transition(&self) -> bool {
        self.kind() == Some(SourceKind::Transition)
    }
}

impl Clone for OwnedSource {
    fn clone(&self) -> Self {
        self.host.retain(self.id);
        Self {
            id: self.id,
            host: Arc::clone(&self.host),
        }
    }
}

impl Drop for OwnedSource {
    fn drop(&mut self) {
        self.host.release(self.id);
    }
}

impl PartialEq for OwnedSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OwnedSource {}

impl std::fmt::Debug for OwnedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedSource").field("id", &self.id).finish()
    }
}

/// Identity of an optional owned reference, for comparisons.
pub(crate) fn id_of(source: Option<&OwnedSource>) -> Option<SourceId> {
    source.map(OwnedSource::id)
}
