use std::str::FromStr;

use crate::foundation::core::DurationMs;
use crate::foundation::error::WatermarkError;
use crate::host::source::{OwnedSource, SourceId};

/// Which transition a request animates with.
///
/// Deserializes through [`FromStr`], so names are case-insensitive and the legacy `match` spelling
/// maps to [`TransitionRole::Default`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TransitionRole {
    /// Fallback for source-to-source switches.
    #[default]
    Default,
    /// Showing the overlay on an empty slot.
    Show,
    /// Hiding the overlay, leaving the slot empty.
    Hide,
    /// Transition picked by the host's routing table for the current pair.
    Override,
}

impl TransitionRole {
    /// Every role, in storage order.
    pub const ALL: [TransitionRole; 4] = [Self::Default, Self::Show, Self::Hide, Self::Override];

    /// Stable storage index.
    pub fn index(self) -> usize {
        match self {
            Self::Default => 0,
            Self::Show => 1,
            Self::Hide => 2,
            Self::Override => 3,
        }
    }

    /// Lowercase name used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Show => "show",
            Self::Hide => "hide",
            Self::Override => "override",
        }
    }
}

impl std::fmt::Display for TransitionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionRole {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "match" => Ok(Self::Default),
            "show" => Ok(Self::Show),
            "hide" => Ok(Self::Hide),
            "override" => Ok(Self::Override),
            other => Err(WatermarkError::validation(format!(
                "unknown transition role '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for TransitionRole {
    type Error = WatermarkError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Transition instance and duration owned by one role.
#[derive(Debug, Default)]
pub(crate) struct RoleSlot {
    /// Private duplicate of a catalog template.
    pub(crate) transition: Option<OwnedSource>,
    /// Catalog name the instance was duplicated from.
    pub(crate) template: String,
    pub(crate) duration: DurationMs,
}

impl RoleSlot {
    pub(crate) fn transition_id(&self) -> Option<SourceId> {
        self.transition.as_ref().map(OwnedSource::id)
    }
}

/// Role-keyed storage; every role lookup goes through [`TransitionRole::index`].
#[derive(Debug, Default)]
pub(crate) struct RoleTable {
    slots: [RoleSlot; 4],
}

impl RoleTable {
    pub(crate) fn get(&self, role: TransitionRole) -> &RoleSlot {
        &self.slots[role.index()]
    }

    pub(crate) fn get_mut(&mut self, role: TransitionRole) -> &mut RoleSlot {
        &mut self.slots[role.index()]
    }

    /// Transition and duration of `role`, if it has an instance.
    pub(crate) fn selection(&self, role: TransitionRole) -> Option<(SourceId, DurationMs)> {
        let slot = self.get(role);
        slot.transition_id().map(|id| (id, slot.duration))
    }

    /// Whether any role owns `id`.
    pub(crate) fn owns(&self, id: SourceId) -> bool {
        self.slots.iter().any(|s| s.transition_id() == Some(id))
    }

    /// Remove every instance, leaving durations in place.
    pub(crate) fn take_all(&mut self) -> Vec<OwnedSource> {
        self.slots
            .iter_mut()
            .filter_map(|s| {
                s.template.clear();
                s.transition.take()
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/role.rs"]
mod tests;
