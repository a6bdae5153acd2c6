use crate::foundation::core::DurationMs;
use crate::host::source::SourceId;

/// One named transition template offered by the host.
///
/// `source` is only borrowed for the lifetime of the query that produced it; keep a template by
/// duplicating it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Template name as shown to the user.
    pub name: String,
    /// Template drawable.
    pub source: SourceId,
}

/// Host-provided list of transition templates available in the current project.
pub trait TransitionCatalog: Send + Sync {
    /// Snapshot of all templates.
    fn list_transitions(&self) -> Vec<CatalogEntry>;
}

/// Transition picked by the host for a `(from, to)` pair of sources.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RouteChoice {
    /// Catalog name of the transition. Empty means "no transition".
    pub transition: String,
    /// Animation duration to use with it.
    pub duration: DurationMs,
}

/// Optional host-side table mapping source pairs to transitions.
pub trait RoutingTable: Send + Sync {
    /// Transition for switching from `from` to `to`. `None` on either side means "nothing".
    fn lookup(&self, from: Option<&str>, to: Option<&str>) -> Option<RouteChoice>;
}

/// Find a template by exact name.
pub(crate) fn find_template<'a>(
    entries: &'a [CatalogEntry],
    name: &str,
) -> Option<&'a CatalogEntry> {
    entries.iter().find(|e| e.name == name)
}
