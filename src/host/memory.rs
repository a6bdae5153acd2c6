//! In-process reference host.
//!
//! [`MemoryHost`] implements the full host contract with explicit reference counts, a
//! `{Idle, Playing}` state machine per transition, and an event log that records every observable
//! mutation. Tests and the `watermark simulate` command drive the compositor against it.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::foundation::core::{Channel, DurationMs};
use crate::foundation::error::{WatermarkError, WatermarkResult};
use crate::host::catalog::{CatalogEntry, RouteChoice, RoutingTable, TransitionCatalog};
use crate::host::scene::{SceneGraph, TransitionControl, TransitionMode};
use crate::host::source::{Acquired, SourceId, SourceKind};

/// Route pattern that matches any source name, including "nothing".
pub const ANY_SOURCE: &str = "*";

/// Playback state of a transition object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Playback {
    /// Not animating; shows `shown` (if any).
    Idle {
        /// Source currently displayed through the transition.
        shown: Option<SourceId>,
    },
    /// Animating from `from` to `to`.
    Playing {
        /// Start state.
        from: Option<SourceId>,
        /// End state.
        to: Option<SourceId>,
        /// How progress advances.
        mode: TransitionMode,
        /// Total animation length.
        duration: DurationMs,
        /// Progress so far.
        elapsed_ms: u32,
    },
}

impl Playback {
    fn held(&self) -> Vec<SourceId> {
        match self {
            Self::Idle { shown } => shown.iter().copied().collect(),
            Self::Playing { from, to, .. } => from.iter().chain(to.iter()).copied().collect(),
        }
    }
}

/// Observable mutation recorded by [`MemoryHost`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// A private source was created.
    Created {
        /// New source.
        id: SourceId,
        /// Host type identifier.
        type_id: String,
    },
    /// A template was duplicated.
    Duplicated {
        /// Template that was copied.
        template: SourceId,
        /// Fresh copy.
        copy: SourceId,
    },
    /// A source's configuration blob was replaced.
    Updated {
        /// Updated source.
        id: SourceId,
    },
    /// An output slot changed occupant.
    SetOutput {
        /// Slot that changed.
        channel: Channel,
        /// New occupant.
        source: Option<SourceId>,
    },
    /// A transition's start state was set.
    TransitionSet {
        /// Transition object.
        transition: SourceId,
        /// Start state.
        start: Option<SourceId>,
    },
    /// A transition started animating.
    TransitionStarted {
        /// Transition object.
        transition: SourceId,
        /// Animation length.
        duration: DurationMs,
        /// End state.
        end: Option<SourceId>,
    },
    /// A transition reached its end state.
    TransitionFinished {
        /// Transition object.
        transition: SourceId,
    },
    /// A transition's playback state was dropped.
    TransitionCleared {
        /// Transition object.
        transition: SourceId,
    },
    /// Swap bracket opened.
    SwapBegin {
        /// Incoming transition.
        new: SourceId,
        /// Outgoing transition.
        old: SourceId,
    },
    /// Swap bracket closed.
    SwapEnd {
        /// Incoming transition.
        new: SourceId,
        /// Outgoing transition.
        old: SourceId,
    },
    /// One reference was given back.
    Released {
        /// Released source.
        id: SourceId,
    },
    /// The last reference was given back and the source was destroyed.
    Destroyed {
        /// Destroyed source.
        id: SourceId,
    },
    /// A release arrived for a source with no references left.
    OverReleased {
        /// Offending source.
        id: SourceId,
    },
}

#[derive(Debug)]
struct Entry {
    name: String,
    type_id: String,
    kind: SourceKind,
    refs: u32,
    settings: serde_json::Value,
    playback: Playback,
}

#[derive(Debug, Default)]
struct HostState {
    next_id: u64,
    sources: HashMap<SourceId, Entry>,
    outputs: BTreeMap<Channel, SourceId>,
    templates: Vec<SourceId>,
    routes: HashMap<(String, String), RouteChoice>,
    swap: Option<(SourceId, SourceId)>,
    events: Vec<HostEvent>,
}

impl HostState {
    fn insert(&mut self, entry: Entry) -> SourceId {
        self.next_id += 1;
        let id = SourceId(self.next_id);
        self.sources.insert(id, entry);
        id
    }

    fn retain(&mut self, id: SourceId) {
        if let Some(entry) = self.sources.get_mut(&id) {
            entry.refs += 1;
        }
    }

    fn release(&mut self, id: SourceId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(entry) = self.sources.get_mut(&id) else {
                tracing::warn!(%id, "release of unknown or destroyed source");
                self.events.push(HostEvent::OverReleased { id });
                continue;
            };
            entry.refs -= 1;
            self.events.push(HostEvent::Released { id });
            if entry.refs == 0 {
                if let Some(entry) = self.sources.remove(&id) {
                    pending.extend(entry.playback.held());
                }
                self.events.push(HostEvent::Destroyed { id });
            }
        }
    }

    fn replace_playback(&mut self, transition: SourceId, playback: Playback) {
        for id in playback.held() {
            self.retain(id);
        }
        let old = match self.sources.get_mut(&transition) {
            Some(entry) => std::mem::replace(&mut entry.playback, playback),
            None => return,
        };
        for id in old.held() {
            self.release(id);
        }
    }

    fn playback(&self, transition: SourceId) -> Option<&Playback> {
        self.sources.get(&transition).map(|e| &e.playback)
    }
}

/// Reference host keeping all state in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a transition template in the catalog. The catalog keeps its own reference.
    pub fn add_transition_template(&self, name: &str) -> SourceId {
        let mut st = self.lock();
        let id = st.insert(Entry {
            name: name.to_string(),
            type_id: format!("{name}_transition"),
            kind: SourceKind::Transition,
            refs: 1,
            settings: serde_json::Value::Null,
            playback: Playback::Idle { shown: None },
        });
        st.templates.push(id);
        id
    }

    /// Register a routing entry. Either side may be [`ANY_SOURCE`].
    pub fn add_route(&self, from: &str, to: &str, choice: RouteChoice) {
        self.lock()
            .routes
            .insert((from.to_string(), to.to_string()), choice);
    }

    /// Occupant of `channel` without taking a reference.
    pub fn occupant(&self, channel: Channel) -> Option<SourceId> {
        self.lock().outputs.get(&channel).copied()
    }

    /// Reference count of `id`, or `None` once destroyed.
    pub fn ref_count(&self, id: SourceId) -> Option<u32> {
        self.lock().sources.get(&id).map(|e| e.refs)
    }

    /// Whether `id` still exists.
    pub fn is_alive(&self, id: SourceId) -> bool {
        self.lock().sources.contains_key(&id)
    }

    /// Number of sources that have not been destroyed, catalog templates included.
    pub fn live_sources(&self) -> usize {
        self.lock().sources.len()
    }

    /// Playback state of a transition.
    pub fn playback(&self, transition: SourceId) -> Option<Playback> {
        self.lock().playback(transition).cloned()
    }

    /// Whether a swap bracket is currently open.
    pub fn swap_in_progress(&self) -> bool {
        self.lock().swap.is_some()
    }

    /// Snapshot of the event log.
    pub fn events(&self) -> Vec<HostEvent> {
        self.lock().events.clone()
    }

    /// Drain the event log.
    pub fn take_events(&self) -> Vec<HostEvent> {
        std::mem::take(&mut self.lock().events)
    }

    /// Number of releases that arrived for sources without references.
    pub fn over_releases(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, HostEvent::OverReleased { .. }))
            .count()
    }

    /// Source drawn on `channel` right now, looking through a transition to its active source.
    pub fn visible_source(&self, channel: Channel) -> Option<SourceId> {
        let st = self.lock();
        let occupant = *st.outputs.get(&channel)?;
        match st.playback(occupant) {
            Some(Playback::Idle { shown }) if is_transition(&st, occupant) => *shown,
            Some(Playback::Playing { to, .. }) => *to,
            _ => Some(occupant),
        }
    }

    /// Advance every automatic animation by `ms`, finishing those that reach their duration.
    pub fn advance(&self, ms: u32) {
        let mut st = self.lock();
        let mut finished = Vec::new();
        for (id, entry) in st.sources.iter_mut() {
            if let Playback::Playing {
                mode: TransitionMode::Auto,
                duration,
                elapsed_ms,
                ..
            } = &mut entry.playback
            {
                *elapsed_ms = elapsed_ms.saturating_add(ms);
                if *elapsed_ms >= duration.as_millis() {
                    finished.push(*id);
                }
            }
        }
        finished.sort();
        for id in finished {
            let to = match st.playback(id) {
                Some(Playback::Playing { to, .. }) => *to,
                _ => continue,
            };
            st.replace_playback(id, Playback::Idle { shown: to });
            st.events.push(HostEvent::TransitionFinished { transition: id });
        }
    }
}

fn is_transition(st: &HostState, id: SourceId) -> bool {
    st.sources
        .get(&id)
        .is_some_and(|e| e.kind == SourceKind::Transition)
}

impl SceneGraph for MemoryHost {
    fn output(&self, channel: Channel) -> Option<Acquired> {
        let mut st = self.lock();
        let id = *st.outputs.get(&channel)?;
        st.retain(id);
        Some(Acquired::new(id))
    }

    fn set_output(&self, channel: Channel, source: Option<SourceId>) {
        let mut st = self.lock();
        if let Some(id) = source {
            st.retain(id);
        }
        let old = match source {
            Some(id) => st.outputs.insert(channel, id),
            None => st.outputs.remove(&channel),
        };
        st.events.push(HostEvent::SetOutput { channel, source });
        if let Some(old) = old {
            st.release(old);
        }
    }

    fn create_source(
        &self,
        type_id: &str,
        name: &str,
        settings: &serde_json::Value,
    ) -> WatermarkResult<Acquired> {
        if type_id.trim().is_empty() {
            return Err(WatermarkError::host("source type id must be non-empty"));
        }
        let mut st = self.lock();
        let id = st.insert(Entry {
            name: name.to_string(),
            type_id: type_id.to_string(),
            kind: SourceKind::Input,
            refs: 1,
            settings: settings.clone(),
            playback: Playback::Idle { shown: None },
        });
        st.events.push(HostEvent::Created {
            id,
            type_id: type_id.to_string(),
        });
        Ok(Acquired::new(id))
    }

    fn update_source(&self, source: SourceId, settings: &serde_json::Value) {
        let mut st = self.lock();
        if let Some(entry) = st.sources.get_mut(&source) {
            entry.settings = settings.clone();
            st.events.push(HostEvent::Updated { id: source });
        }
    }

    fn source_settings(&self, source: SourceId) -> Option<serde_json::Value> {
        self.lock().sources.get(&source).map(|e| e.settings.clone())
    }

    fn duplicate(&self, source: SourceId, name: &str) -> Option<Acquired> {
        let mut st = self.lock();
        let (type_id, kind, settings) = {
            let e = st.sources.get(&source)?;
            (e.type_id.clone(), e.kind, e.settings.clone())
        };
        let copy = st.insert(Entry {
            name: name.to_string(),
            type_id,
            kind,
            refs: 1,
            settings,
            playback: Playback::Idle { shown: None },
        });
        st.events.push(HostEvent::Duplicated {
            template: source,
            copy,
        });
        Some(Acquired::new(copy))
    }

    fn source_name(&self, source: SourceId) -> Option<String> {
        self.lock().sources.get(&source).map(|e| e.name.clone())
    }

    fn source_kind(&self, source: SourceId) -> Option<SourceKind> {
        self.lock().sources.get(&source).map(|e| e.kind)
    }

    fn retain(&self, source: SourceId) {
        self.lock().retain(source);
    }

    fn release(&self, source: SourceId) {
        self.lock().release(source);
    }
}

impl TransitionControl for MemoryHost {
    fn transition_active_source(&self, transition: SourceId) -> Option<Acquired> {
        let mut st = self.lock();
        let active = match st.playback(transition)? {
            Playback::Idle { shown } => *shown,
            Playback::Playing { to, .. } => *to,
        }?;
        st.retain(active);
        Some(Acquired::new(active))
    }

    fn transition_set(&self, transition: SourceId, start: Option<SourceId>) {
        let mut st = self.lock();
        st.replace_playback(transition, Playback::Idle { shown: start });
        st.events.push(HostEvent::TransitionSet { transition, start });
    }

    fn transition_start(
        &self,
        transition: SourceId,
        mode: TransitionMode,
        duration: DurationMs,
        end: Option<SourceId>,
    ) {
        let mut st = self.lock();
        let from = match st.playback(transition) {
            Some(Playback::Idle { shown }) => *shown,
            Some(Playback::Playing { to, .. }) => *to,
            None => return,
        };
        st.replace_playback(
            transition,
            Playback::Playing {
                from,
                to: end,
                mode,
                duration,
                elapsed_ms: 0,
            },
        );
        st.events.push(HostEvent::TransitionStarted {
            transition,
            duration,
            end,
        });
    }

    fn transition_clear(&self, transition: SourceId) {
        let mut st = self.lock();
        st.replace_playback(transition, Playback::Idle { shown: None });
        st.events.push(HostEvent::TransitionCleared { transition });
    }

    fn transition_swap_begin(&self, new: SourceId, old: SourceId) {
        let mut st = self.lock();
        if let Some(playback) = st.playback(old).cloned() {
            st.replace_playback(new, playback);
        }
        st.swap = Some((new, old));
        st.events.push(HostEvent::SwapBegin { new, old });
    }

    fn transition_swap_end(&self, new: SourceId, old: SourceId) {
        let mut st = self.lock();
        if st.swap != Some((new, old)) {
            tracing::warn!(%new, %old, "swap end without matching begin");
        }
        st.swap = None;
        st.events.push(HostEvent::SwapEnd { new, old });
    }
}

impl TransitionCatalog for MemoryHost {
    fn list_transitions(&self) -> Vec<CatalogEntry> {
        let st = self.lock();
        st.templates
            .iter()
            .filter_map(|id| {
                st.sources.get(id).map(|e| CatalogEntry {
                    name: e.name.clone(),
                    source: *id,
                })
            })
            .collect()
    }
}

impl RoutingTable for MemoryHost {
    fn lookup(&self, from: Option<&str>, to: Option<&str>) -> Option<RouteChoice> {
        let st = self.lock();
        let from = from.unwrap_or("");
        let to = to.unwrap_or("");
        [(from, to), (from, ANY_SOURCE), (ANY_SOURCE, to), (ANY_SOURCE, ANY_SOURCE)]
            .into_iter()
            .find_map(|(f, t)| st.routes.get(&(f.to_string(), t.to_string())).cloned())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/memory.rs"]
mod tests;
