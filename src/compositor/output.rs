use std::sync::Arc;

use crate::compositor::role::{RoleTable, TransitionRole};
use crate::foundation::core::{Channel, DurationMs};
use crate::host::catalog::{RoutingTable, TransitionCatalog, find_template};
use crate::host::scene::{SceneHost, TransitionMode};
use crate::host::source::{Acquired, OwnedSource, SourceId, id_of};

/// What [`OutputCompositor::apply_source`] did to the output slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The requested source was already the active one.
    Unchanged,
    /// The slot was set directly to the requested source.
    Cut,
    /// A transition was started toward the requested source.
    Animated {
        /// Role whose instance was used.
        role: TransitionRole,
        /// Transition instance that is animating.
        transition: SourceId,
        /// Animation length.
        duration: DurationMs,
    },
}

/// Drives one output channel, switching between sources with per-role transitions.
///
/// The compositor never caches the slot's occupant: every operation reads it fresh from the host.
/// Each role owns a private duplicate of a catalog template, released when replaced or when the
/// compositor is dropped.
///
/// All operations must be called from a single control thread; the host's swap bracket is the only
/// synchronization against the render thread.
pub struct OutputCompositor {
    host: Arc<dyn SceneHost>,
    catalog: Arc<dyn TransitionCatalog>,
    routing: Option<Arc<dyn RoutingTable>>,
    channel: Channel,
    roles: RoleTable,
    /// Last source or transition this compositor put into the slot.
    installed: Option<SourceId>,
}

impl OutputCompositor {
    /// Create a compositor for `channel` with no transitions configured.
    pub fn new(
        host: Arc<dyn SceneHost>,
        catalog: Arc<dyn TransitionCatalog>,
        channel: Channel,
    ) -> Self {
        Self {
            host,
            catalog,
            routing: None,
            channel,
            roles: RoleTable::default(),
            installed: None,
        }
    }

    /// Consult `routing` for source-to-source switches.
    pub fn with_routing(mut self, routing: Arc<dyn RoutingTable>) -> Self {
        self.routing = Some(routing);
        self
    }

    /// Output channel driven by this compositor.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Transition instance currently owned by `role`.
    pub fn transition(&self, role: TransitionRole) -> Option<SourceId> {
        self.roles.get(role).transition_id()
    }

    /// Catalog name the instance of `role` was duplicated from.
    pub fn transition_name(&self, role: TransitionRole) -> Option<&str> {
        let slot = self.roles.get(role);
        slot.transition.as_ref().map(|_| slot.template.as_str())
    }

    /// Duration used when `role` is selected.
    pub fn transition_duration(&self, role: TransitionRole) -> DurationMs {
        self.roles.get(role).duration
    }

    /// Set both the transition and the duration of `role`.
    pub fn configure(&mut self, role: TransitionRole, name: &str, duration: DurationMs) {
        self.set_transition(name, role);
        self.set_transition_duration(duration, role);
    }

    /// Switch the output slot to `source` (or to nothing), animating when a transition applies.
    ///
    /// Selection order: `Show` when the slot goes from empty to a source, `Hide` when it goes from
    /// a source to empty, otherwise the routing table's choice (installed as `Override`) and
    /// finally `Default`. Without any transition the slot is cut directly.
    #[tracing::instrument(
        skip(self, source),
        fields(channel = self.channel.0, target = ?id_of(source))
    )]
    pub fn apply_source(&mut self, source: Option<&OwnedSource>) -> ApplyOutcome {
        let occupant = self.current_occupant();
        let (proxy, prev) = match occupant {
            Some(o) if o.is_transition() => {
                let active = self.adopt(self.host.transition_active_source(o.id()));
                (Some(o), active)
            }
            other => (None, other),
        };

        let next_id = id_of(source);
        if id_of(prev.as_ref()) == next_id {
            tracing::trace!(proxy = ?id_of(proxy.as_ref()), "target already active");
            return ApplyOutcome::Unchanged;
        }

        let Some((role, transition, duration)) = self.select_transition(prev.as_ref(), source)
        else {
            tracing::debug!("no transition configured, cutting");
            self.install(next_id);
            return ApplyOutcome::Cut;
        };

        tracing::debug!(%role, %transition, %duration, "animating");
        self.host.transition_set(transition, id_of(prev.as_ref()));
        self.host
            .transition_start(transition, TransitionMode::Auto, duration, next_id);

        let playing = self.current_occupant();
        if id_of(playing.as_ref()) != Some(transition) {
            self.install(Some(transition));
        }

        ApplyOutcome::Animated {
            role,
            transition,
            duration,
        }
    }

    /// Replace the transition instance of `role` with a private duplicate of catalog entry `name`.
    ///
    /// An empty or unknown name clears the role. When the replaced instance occupies the slot, the
    /// new one is swapped in under the host's swap bracket (or the slot is emptied if there is no
    /// new instance).
    #[tracing::instrument(skip(self), fields(channel = self.channel.0))]
    pub fn set_transition(&mut self, name: &str, role: TransitionRole) {
        let slot = self.roles.get(role);
        let old_id = slot.transition_id();
        if old_id.is_none() && name.is_empty() {
            tracing::trace!("role already empty");
            return;
        }
        if old_id.is_some() && slot.template == name {
            tracing::trace!("role already uses this template");
            return;
        }

        let fresh = if name.is_empty() {
            None
        } else {
            self.duplicate_template(name)
        };
        let fresh_id = id_of(fresh.as_ref());

        let slot = self.roles.get_mut(role);
        let old = std::mem::replace(&mut slot.transition, fresh);
        slot.template = match fresh_id {
            Some(_) => name.to_string(),
            None => String::new(),
        };

        let occupant = self.current_occupant();
        match old_id {
            Some(old_id) if id_of(occupant.as_ref()) == Some(old_id) => match fresh_id {
                Some(fresh_id) => {
                    tracing::debug!(old = %old_id, new = %fresh_id, "swapping live transition");
                    self.host.transition_swap_begin(fresh_id, old_id);
                    self.install(Some(fresh_id));
                    self.host.transition_swap_end(fresh_id, old_id);
                }
                None => {
                    tracing::debug!(old = %old_id, "live transition removed, clearing slot");
                    self.install(None);
                }
            },
            Some(old_id) => {
                tracing::debug!(old = %old_id, "replaced transition is not live, slot untouched");
            }
            None => {}
        }
        drop(occupant);

        if let Some(old) = old {
            self.host.transition_clear(old.id());
        }
    }

    /// Set the duration `role` animates with. Takes effect on the next switch.
    pub fn set_transition_duration(&mut self, duration: DurationMs, role: TransitionRole) {
        self.roles.get_mut(role).duration = duration;
    }

    fn select_transition(
        &mut self,
        prev: Option<&OwnedSource>,
        next: Option<&OwnedSource>,
    ) -> Option<(TransitionRole, SourceId, DurationMs)> {
        let directional = match (prev, next) {
            (None, Some(_)) => Some(TransitionRole::Show),
            (Some(_), None) => Some(TransitionRole::Hide),
            _ => None,
        };
        if let Some(role) = directional
            && let Some((id, duration)) = self.roles.selection(role)
        {
            return Some((role, id, duration));
        }

        self.refresh_override(prev, next);
        [TransitionRole::Override, TransitionRole::Default]
            .into_iter()
            .find_map(|role| {
                self.roles
                    .selection(role)
                    .map(|(id, duration)| (role, id, duration))
            })
    }

    /// Load the routing table's answer for this pair into the `Override` role.
    fn refresh_override(&mut self, prev: Option<&OwnedSource>, next: Option<&OwnedSource>) {
        let from = prev.and_then(OwnedSource::name);
        let to = next.and_then(OwnedSource::name);
        let choice = self
            .routing
            .as_ref()
            .and_then(|table| table.lookup(from.as_deref(), to.as_deref()));

        match choice {
            Some(choice) => {
                tracing::debug!(?from, ?to, transition = %choice.transition, "routing table match");
                self.set_transition(&choice.transition, TransitionRole::Override);
                self.set_transition_duration(choice.duration, TransitionRole::Override);
            }
            None => self.set_transition("", TransitionRole::Override),
        }
    }

    fn duplicate_template(&self, name: &str) -> Option<OwnedSource> {
        let entries = self.catalog.list_transitions();
        let Some(entry) = find_template(&entries, name) else {
            tracing::debug!(name, "transition not in catalog");
            return None;
        };
        self.adopt(self.host.duplicate(entry.source, &entry.name))
    }

    fn current_occupant(&self) -> Option<OwnedSource> {
        self.adopt(self.host.output(self.channel))
    }

    fn adopt(&self, acquired: Option<Acquired>) -> Option<OwnedSource> {
        acquired.map(|a| OwnedSource::adopt(Arc::clone(&self.host), a))
    }

    fn install(&mut self, source: Option<SourceId>) {
        self.host.set_output(self.channel, source);
        self.installed = source;
    }
}

impl Drop for OutputCompositor {
    fn drop(&mut self) {
        let occupant = self.current_occupant();
        if let Some(o) = &occupant
            && (self.roles.owns(o.id()) || self.installed == Some(o.id()))
        {
            self.host.set_output(self.channel, None);
        }
        drop(occupant);

        for transition in self.roles.take_all() {
            self.host.transition_clear(transition.id());
        }
    }
}

impl std::fmt::Debug for OutputCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputCompositor")
            .field("channel", &self.channel)
            .field("roles", &self.roles)
            .field("installed", &self.installed)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/output.rs"]
mod tests;
