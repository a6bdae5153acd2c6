use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::compositor::output::OutputCompositor;
use crate::compositor::role::TransitionRole;
use crate::foundation::core::{Channel, DurationMs};
use crate::foundation::error::{WatermarkError, WatermarkResult};
use crate::host::catalog::RouteChoice;
use crate::host::memory::{ANY_SOURCE, MemoryHost};
use crate::overlay::settings::OverlaySettings;

/// Transition and duration configured for one role.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Catalog name of the transition.
    pub name: String,
    /// Animation length.
    #[serde(default)]
    pub duration_ms: DurationMs,
}

/// Per-role transition configuration; unset roles stay empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionsConfig {
    /// Fallback for source-to-source switches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RoleConfig>,
    /// Empty slot to overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<RoleConfig>,
    /// Overlay to empty slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<RoleConfig>,
    /// Initial override; replaced whenever the routing table is consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#override: Option<RoleConfig>,
}

impl TransitionsConfig {
    /// Configuration of `role`.
    pub fn role(&self, role: TransitionRole) -> Option<&RoleConfig> {
        match role {
            TransitionRole::Default => self.default.as_ref(),
            TransitionRole::Show => self.show.as_ref(),
            TransitionRole::Hide => self.hide.as_ref(),
            TransitionRole::Override => self.r#override.as_ref(),
        }
    }
}

/// Routing table entry used by the in-memory host.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Source name switched away from, or `"*"`.
    pub from: String,
    /// Source name switched to, or `"*"`.
    pub to: String,
    /// Catalog name of the transition.
    pub transition: String,
    /// Animation length.
    #[serde(default)]
    pub duration_ms: DurationMs,
}

/// On-disk configuration of a watermark and, for simulation, the host it runs against.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Output channel to drive.
    #[serde(default)]
    pub channel: Channel,
    /// Overlay image and placement.
    #[serde(default)]
    pub overlay: OverlaySettings,
    /// Transitions per role.
    #[serde(default)]
    pub transitions: TransitionsConfig,
    /// Transition templates offered by the simulated host.
    #[serde(default)]
    pub catalog: Vec<String>,
    /// Routing table of the simulated host.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl WatermarkConfig {
    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> WatermarkResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| WatermarkError::config(format!("parse watermark config JSON: {e}")))
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> WatermarkResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            WatermarkError::config(format!("open watermark config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check overlay values and that every transition named is in the catalog, if one is given.
    pub fn validate(&self) -> WatermarkResult<()> {
        self.overlay.validate()?;

        for role in TransitionRole::ALL {
            let Some(cfg) = self.transitions.role(role) else {
                continue;
            };
            if cfg.name.trim().is_empty() {
                return Err(WatermarkError::validation(format!(
                    "transition name for role '{role}' must be non-empty"
                )));
            }
            self.check_catalog(&cfg.name, &format!("role '{role}'"))?;
        }

        for route in &self.routes {
            if route.from.is_empty() && route.to.is_empty() {
                return Err(WatermarkError::validation(format!(
                    "route must name a source on at least one side (use '{ANY_SOURCE}' for any)"
                )));
            }
            if !route.transition.is_empty() {
                self.check_catalog(
                    &route.transition,
                    &format!("route '{}' -> '{}'", route.from, route.to),
                )?;
            }
        }
        Ok(())
    }

    fn check_catalog(&self, name: &str, context: &str) -> WatermarkResult<()> {
        // An empty catalog means the live host supplies it.
        if self.catalog.is_empty() || self.catalog.iter().any(|n| n == name) {
            return Ok(());
        }
        Err(WatermarkError::validation(format!(
            "{context} names transition '{name}' which is not in the catalog"
        )))
    }

    /// Configure every role named here on `compositor`.
    pub fn apply_to(&self, compositor: &mut OutputCompositor) {
        for role in TransitionRole::ALL {
            if let Some(cfg) = self.transitions.role(role) {
                compositor.configure(role, &cfg.name, cfg.duration_ms);
            }
        }
    }

    /// Register the catalog and routing table on an in-memory host.
    pub fn seed_host(&self, host: &MemoryHost) {
        for name in &self.catalog {
            host.add_transition_template(name);
        }
        for route in &self.routes {
            host.add_route(
                &route.from,
                &route.to,
                RouteChoice {
                    transition: route.transition.clone(),
                    duration: route.duration_ms,
                },
            );
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
