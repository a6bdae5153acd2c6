//! Scripted runs of a [`Watermark`] against the in-memory host.
//!
//! A script is a JSON array of [`Step`]s. Each step is applied in order and summarized in a
//! [`StepReport`] carrying the slot state and the host events it caused, so transition behavior can
//! be inspected without a live application.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compositor::output::{ApplyOutcome, OutputCompositor};
use crate::compositor::role::TransitionRole;
use crate::config::WatermarkConfig;
use crate::foundation::core::{DurationMs, Point};
use crate::foundation::error::{WatermarkError, WatermarkResult};
use crate::host::memory::{HostEvent, MemoryHost};
use crate::host::source::SourceId;
use crate::watermark::Watermark;

/// One scripted operator action.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Put the overlay on air.
    Show,
    /// Take the overlay off air.
    Hide,
    /// Flip visibility.
    Toggle,
    /// Let automatic animations progress.
    Advance {
        /// Milliseconds to advance.
        ms: u32,
    },
    /// Load a new image.
    SetImage {
        /// Image file.
        path: PathBuf,
    },
    /// Move and rescale the overlay.
    SetPlacement {
        /// Left edge in output pixels.
        x: f64,
        /// Top edge in output pixels.
        y: f64,
        /// Uniform scale.
        scale: f64,
    },
    /// Change the overlay opacity.
    SetOpacity {
        /// Opacity in `[0, 1]`.
        opacity: f32,
    },
    /// Pick a catalog transition for a role; an empty name clears it.
    SetTransition {
        /// Role to change.
        role: TransitionRole,
        /// Catalog name.
        name: String,
    },
    /// Re-read the overlay source's blob from the host.
    Sync,
    /// Change a role's duration.
    SetDuration {
        /// Role to change.
        role: TransitionRole,
        /// New duration.
        duration_ms: DurationMs,
    },
}

/// State observed after one step.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StepReport {
    /// Position of the step in the script.
    pub index: usize,
    /// The step that ran.
    pub step: Step,
    /// Slot decision, for steps that switch the output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ApplyOutcome>,
    /// Occupant of the output slot afterwards.
    pub occupant: Option<SourceId>,
    /// Source drawn on air afterwards, looking through transitions.
    pub on_air: Option<SourceId>,
    /// Host mutations caused by the step.
    pub events: Vec<HostEvent>,
}

/// Host state left behind once the watermark is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TeardownReport {
    /// Occupant of the output slot after teardown.
    pub occupant: Option<SourceId>,
    /// Sources still alive, catalog templates included.
    pub live_sources: usize,
    /// Releases that found no reference to give back.
    pub over_releases: usize,
}

/// Result of [`run_script`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SimulationReport {
    /// Host events produced while setting up from the configuration.
    pub setup: Vec<HostEvent>,
    /// One entry per script step.
    pub steps: Vec<StepReport>,
    /// Host state after the watermark was dropped.
    pub teardown: TeardownReport,
}

/// Parse a script from a JSON reader.
pub fn read_script<R: std::io::Read>(r: R) -> WatermarkResult<Vec<Step>> {
    serde_json::from_reader(r)
        .map_err(|e| WatermarkError::serde(format!("parse simulation script JSON: {e}")))
}

/// Parse a script from a JSON file on disk.
pub fn script_from_path(path: impl AsRef<Path>) -> WatermarkResult<Vec<Step>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| {
        WatermarkError::config(format!("open simulation script '{}': {e}", path.display()))
    })?;
    read_script(BufReader::new(f))
}

/// Build a host from `config`, run `steps` against a fresh watermark, then tear it down.
///
/// The first failing step aborts the run.
#[tracing::instrument(skip_all, fields(channel = config.channel.0, steps = steps.len()))]
pub fn run_script(config: &WatermarkConfig, steps: &[Step]) -> WatermarkResult<SimulationReport> {
    config.validate()?;

    let host = Arc::new(MemoryHost::new());
    config.seed_host(&host);

    let mut compositor = OutputCompositor::new(host.clone(), host.clone(), config.channel)
        .with_routing(host.clone());
    config.apply_to(&mut compositor);

    let mut wm = Watermark::new(host.clone(), compositor);
    wm.set_placement(config.overlay.position, config.overlay.scale)?;
    wm.set_opacity(config.overlay.opacity)?;
    if !config.overlay.file.as_os_str().is_empty() {
        wm.set_image_path(&config.overlay.file)?;
    }
    let setup = host.take_events();

    let mut reports = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let outcome = apply_step(&mut wm, &host, step)?;
        tracing::debug!(index, ?step, ?outcome, "step applied");
        reports.push(StepReport {
            index,
            step: step.clone(),
            outcome,
            occupant: host.occupant(config.channel),
            on_air: host.visible_source(config.channel),
            events: host.take_events(),
        });
    }

    drop(wm);
    let teardown = TeardownReport {
        occupant: host.occupant(config.channel),
        live_sources: host.live_sources(),
        over_releases: host.over_releases(),
    };
    if teardown.over_releases > 0 {
        tracing::warn!(count = teardown.over_releases, "references released twice");
    }

    Ok(SimulationReport {
        setup,
        steps: reports,
        teardown,
    })
}

fn apply_step(
    wm: &mut Watermark,
    host: &MemoryHost,
    step: &Step,
) -> WatermarkResult<Option<ApplyOutcome>> {
    let outcome = match step {
        Step::Show => Some(wm.show()),
        Step::Hide => Some(wm.hide()),
        Step::Toggle => Some(wm.toggle()),
        Step::Advance { ms } => {
            host.advance(*ms);
            None
        }
        Step::SetImage { path } => Some(wm.set_image_path(path)?),
        Step::SetPlacement { x, y, scale } => {
            wm.set_placement(Point::new(*x, *y), *scale)?;
            None
        }
        Step::SetOpacity { opacity } => {
            wm.set_opacity(*opacity)?;
            None
        }
        Step::Sync => {
            wm.sync_from_source()?;
            None
        }
        Step::SetTransition { role, name } => {
            wm.compositor_mut().set_transition(name, *role);
            None
        }
        Step::SetDuration { role, duration_ms } => {
            wm.compositor_mut()
                .set_transition_duration(*duration_ms, *role);
            None
        }
    };
    Ok(outcome)
}

#[cfg(test)]
#[path = "../tests/unit/simulate.rs"]
mod tests;
