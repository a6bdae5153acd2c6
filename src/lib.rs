//! Downstream watermark overlay for a live output channel.
//!
//! The crate keeps one overlay image on a dedicated output channel of a host application and
//! switches it on and off air with animated transitions:
//!
//! - [`OutputCompositor`] drives one channel, picking a transition per [`TransitionRole`]
//! - [`Watermark`] owns the overlay source, its [`OverlaySettings`], and visibility
//! - [`SceneHost`], [`TransitionCatalog`], and [`RoutingTable`] describe what the host provides
//! - [`MemoryHost`] is an in-process host used by tests and the `watermark simulate` command
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod compositor;
pub(crate) mod config;
pub(crate) mod host;
pub(crate) mod overlay;
pub mod simulate;
pub(crate) mod watermark;

pub use crate::foundation::core::{
    Channel, DEFAULT_CHANNEL, DEFAULT_DURATION, DurationMs, Point, Rect,
};
pub use crate::foundation::error::{WatermarkError, WatermarkResult};

pub use crate::compositor::output::{ApplyOutcome, OutputCompositor};
pub use crate::compositor::role::TransitionRole;
pub use crate::config::{RoleConfig, RouteConfig, TransitionsConfig, WatermarkConfig};
pub use crate::host::catalog::{CatalogEntry, RouteChoice, RoutingTable, TransitionCatalog};
pub use crate::host::memory::{ANY_SOURCE, HostEvent, MemoryHost, Playback};
pub use crate::host::scene::{SceneGraph, SceneHost, TransitionControl, TransitionMode};
pub use crate::host::source::{Acquired, OwnedSource, SourceId, SourceKind};
pub use crate::overlay::image::{ImageSize, OverlayPlacement, probe_image_size};
pub use crate::overlay::persist::{PersistedSettings, SAVE_KEY};
pub use crate::overlay::settings::{
    OVERLAY_SOURCE_NAME, OVERLAY_SOURCE_TYPE, OverlaySettings, SUPPORTED_EXTENSIONS,
    is_supported_image, read_intrinsic_size, write_intrinsic_size,
};
pub use crate::watermark::Watermark;
