use crate::foundation::core::{Channel, DurationMs};
use crate::foundation::error::WatermarkResult;
use crate::host::source::{Acquired, SourceId, SourceKind};

/// Playback mode for [`TransitionControl::transition_start`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// The host advances the animation on its render thread over the given duration.
    #[default]
    Auto,
    /// The caller drives progress explicitly.
    Manual,
}

/// Scene-graph half of the host contract.
///
/// Methods returning [`Acquired`] hand one reference to the caller. Methods taking a bare
/// [`SourceId`] only borrow it for the duration of the call.
pub trait SceneGraph {
    /// Current occupant of `channel`, with one reference attached.
    fn output(&self, channel: Channel) -> Option<Acquired>;

    /// Install `source` (or nothing) as the occupant of `channel`. The host keeps its own reference.
    fn set_output(&self, channel: Channel, source: Option<SourceId>);

    /// Create a private (not listed in any scene) source of host type `type_id`.
    fn create_source(
        &self,
        type_id: &str,
        name: &str,
        settings: &serde_json::Value,
    ) -> WatermarkResult<Acquired>;

    /// Replace the configuration blob of `source`.
    fn update_source(&self, source: SourceId, settings: &serde_json::Value);

    /// Configuration blob of `source`, including values written back by its renderer.
    fn source_settings(&self, source: SourceId) -> Option<serde_json::Value>;

    /// Fresh private copy of `source` with its own playback state.
    fn duplicate(&self, source: SourceId, name: &str) -> Option<Acquired>;

    /// Host-side name of `source`.
    fn source_name(&self, source: SourceId) -> Option<String>;

    /// Host-side type tag of `source`.
    fn source_kind(&self, source: SourceId) -> Option<SourceKind>;

    /// Add one reference to `source`.
    fn retain(&self, source: SourceId);

    /// Give back one reference to `source`.
    fn release(&self, source: SourceId);
}

/// Transition half of the host contract.
pub trait TransitionControl {
    /// Source the transition is animating toward, or showing when idle; one reference attached.
    fn transition_active_source(&self, transition: SourceId) -> Option<Acquired>;

    /// Set the state the next animation starts from.
    fn transition_set(&self, transition: SourceId, start: Option<SourceId>);

    /// Start animating toward `end`. A new start always supersedes the previous animation.
    fn transition_start(
        &self,
        transition: SourceId,
        mode: TransitionMode,
        duration: DurationMs,
        end: Option<SourceId>,
    );

    /// Drop all playback state and the sources the transition references.
    fn transition_clear(&self, transition: SourceId);

    /// Open the swap bracket: `new` takes over the playback state of `old`.
    fn transition_swap_begin(&self, new: SourceId, old: SourceId);

    /// Close the swap bracket opened by [`TransitionControl::transition_swap_begin`].
    fn transition_swap_end(&self, new: SourceId, old: SourceId);
}

/// Everything the compositor needs from the host application.
pub trait SceneHost: SceneGraph + TransitionControl + Send + Sync {}

impl<T> SceneHost for T where T: SceneGraph + TransitionControl + Send + Sync {}
