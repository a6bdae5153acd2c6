use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compositor::output::{ApplyOutcome, OutputCompositor};
use crate::foundation::core::Point;
use crate::foundation::error::WatermarkResult;
use crate::host::scene::SceneHost;
use crate::host::source::{OwnedSource, SourceId};
use crate::overlay::image::{ImageSize, probe_image_size};
use crate::overlay::persist::PersistedSettings;
use crate::overlay::settings::{
    OVERLAY_SOURCE_NAME, OVERLAY_SOURCE_TYPE, OverlaySettings, read_intrinsic_size,
    write_intrinsic_size,
};

/// The overlay as the operator sees it: one image, its placement, and whether it is on air.
///
/// Settings changes feed the overlay source; visibility changes feed
/// [`OutputCompositor::apply_source`].
pub struct Watermark {
    // Dropped first so the slot is cleared before the overlay source is released.
    compositor: OutputCompositor,
    source: Option<OwnedSource>,
    host: Arc<dyn SceneHost>,
    settings: OverlaySettings,
    blob: serde_json::Value,
    visible: bool,
}

impl Watermark {
    /// Wrap `compositor`; nothing is created until an image path is set.
    pub fn new(host: Arc<dyn SceneHost>, compositor: OutputCompositor) -> Self {
        let settings = OverlaySettings::default();
        let blob = settings.to_blob();
        Self {
            compositor,
            source: None,
            host,
            settings,
            blob,
            visible: true,
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    /// Renderer configuration blob last handed to the overlay source.
    pub fn blob(&self) -> &serde_json::Value {
        &self.blob
    }

    /// Image size reported after the last load.
    pub fn intrinsic_size(&self) -> Option<ImageSize> {
        read_intrinsic_size(&self.blob)
    }

    /// Current overlay source.
    pub fn source(&self) -> Option<SourceId> {
        self.source.as_ref().map(OwnedSource::id)
    }

    /// Whether the overlay is requested on air.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The compositor driving the output channel.
    pub fn compositor(&self) -> &OutputCompositor {
        &self.compositor
    }

    /// Mutable access for transition configuration.
    pub fn compositor_mut(&mut self) -> &mut OutputCompositor {
        &mut self.compositor
    }

    /// Load a new image: the old source is taken off air, a new one is created and shown.
    #[tracing::instrument(skip(self, path), fields(file = %path.as_ref().display()))]
    pub fn set_image_path(&mut self, path: impl AsRef<Path>) -> WatermarkResult<ApplyOutcome> {
        let file = PathBuf::from(path.as_ref());
        let next = OverlaySettings {
            file,
            ..self.settings.clone()
        };
        next.validate()?;

        if self.source.take().is_some() {
            self.compositor.apply_source(None);
        }
        self.settings = next;
        self.blob = self.settings.to_blob();
        self.report_intrinsic_size();

        let acquired = self
            .host
            .create_source(OVERLAY_SOURCE_TYPE, OVERLAY_SOURCE_NAME, &self.blob)?;
        let source = OwnedSource::adopt(Arc::clone(&self.host), acquired);
        tracing::debug!(source = %source.id(), "overlay source created");
        self.source = Some(source);
        Ok(self.present())
    }

    /// Move and rescale the overlay in place; the output slot is not touched.
    pub fn set_placement(&mut self, position: Point, scale: f64) -> WatermarkResult<()> {
        let next = OverlaySettings {
            position,
            scale,
            ..self.settings.clone()
        };
        next.validate()?;
        self.settings = next;
        self.push_settings();
        Ok(())
    }

    /// Change the overlay opacity in place.
    pub fn set_opacity(&mut self, opacity: f32) -> WatermarkResult<()> {
        let next = OverlaySettings {
            opacity,
            ..self.settings.clone()
        };
        next.validate()?;
        self.settings = next;
        self.push_settings();
        Ok(())
    }

    /// Adopt the blob the host currently holds for the overlay source.
    ///
    /// Picks up values written by the renderer or by other editors of the source, including the
    /// reported image size. Returns `false` when there is no source to read from; on invalid
    /// values nothing changes.
    pub fn sync_from_source(&mut self) -> WatermarkResult<bool> {
        let Some(source) = &self.source else {
            return Ok(false);
        };
        let Some(blob) = self.host.source_settings(source.id()) else {
            return Ok(false);
        };
        let settings = OverlaySettings::from_blob(&blob)?;
        settings.validate()?;
        tracing::debug!(source = %source.id(), "overlay settings read back from host");
        self.settings = settings;
        self.blob = blob;
        Ok(true)
    }

    /// Put the overlay on air.
    pub fn show(&mut self) -> ApplyOutcome {
        self.visible = true;
        self.present()
    }

    /// Take the overlay off air.
    pub fn hide(&mut self) -> ApplyOutcome {
        self.visible = false;
        self.present()
    }

    /// Flip visibility.
    pub fn toggle(&mut self) -> ApplyOutcome {
        if self.visible { self.hide() } else { self.show() }
    }

    /// Store the settings into the frontend's save data.
    pub fn save(&self, save_data: &mut serde_json::Value) -> WatermarkResult<()> {
        PersistedSettings::capture(&self.settings).store(save_data)
    }

    /// Restore saved settings and reload the image.
    ///
    /// Returns `None` when the save data holds nothing for the overlay.
    pub fn load(&mut self, save_data: &serde_json::Value) -> WatermarkResult<Option<ApplyOutcome>> {
        let Some(saved) = PersistedSettings::load(save_data)? else {
            return Ok(None);
        };
        let mut next = self.settings.clone();
        saved.apply_to(&mut next);
        next.validate()?;
        let file = next.file.clone();
        self.settings = next;
        self.set_image_path(file).map(Some)
    }

    fn present(&mut self) -> ApplyOutcome {
        let target = if self.visible {
            self.source.as_ref()
        } else {
            None
        };
        self.compositor.apply_source(target)
    }

    fn push_settings(&mut self) {
        self.settings.write_into(&mut self.blob);
        if let Some(source) = &self.source {
            self.host.update_source(source.id(), &self.blob);
        }
    }

    fn report_intrinsic_size(&mut self) {
        if self.settings.file.as_os_str().is_empty() {
            return;
        }
        let size = match probe_image_size(&self.settings.file) {
            Ok(size) => size,
            Err(err) => {
                tracing::warn!(error = %err, "overlay image could not be loaded, drawing nothing");
                ImageSize::default()
            }
        };
        write_intrinsic_size(&mut self.blob, size);
    }
}

impl std::fmt::Debug for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watermark")
            .field("compositor", &self.compositor)
            .field("source", &self.source)
            .field("settings", &self.settings)
            .field("visible", &self.visible)
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/watermark.rs"]
mod tests;
