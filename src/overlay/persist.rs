use std::path::PathBuf;

use crate::foundation::core::Point;
use crate::foundation::error::{WatermarkError, WatermarkResult};
use crate::overlay::settings::OverlaySettings;

/// Key under which the settings live in the frontend's save data.
pub const SAVE_KEY: &str = "downstream-watermark";

/// Overlay settings as stored with the frontend's scene collection.
///
/// Every field is optional on load: only values the user actually saved are applied.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PersistedSettings {
    /// Image file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Horizontal position in output pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    /// Vertical position in output pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
    /// Image scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Overlay opacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

impl PersistedSettings {
    /// Snapshot every field of `settings`.
    pub fn capture(settings: &OverlaySettings) -> Self {
        Self {
            path: Some(settings.file.to_string_lossy().into_owned()),
            x: Some(settings.position.x.round() as i64),
            y: Some(settings.position.y.round() as i64),
            scale: Some(settings.scale),
            opacity: Some(settings.opacity),
        }
    }

    /// Overwrite the fields of `settings` that were saved.
    pub fn apply_to(&self, settings: &mut OverlaySettings) {
        if let Some(path) = &self.path {
            settings.file = PathBuf::from(path);
        }
        let x = self.x.map_or(settings.position.x, |x| x as f64);
        let y = self.y.map_or(settings.position.y, |y| y as f64);
        settings.position = Point::new(x, y);
        if let Some(scale) = self.scale {
            settings.scale = scale;
        }
        if let Some(opacity) = self.opacity {
            settings.opacity = opacity;
        }
    }

    /// Write into the frontend's save data under [`SAVE_KEY`].
    pub fn store(&self, save_data: &mut serde_json::Value) -> WatermarkResult<()> {
        if save_data.is_null() {
            *save_data = serde_json::Value::Object(serde_json::Map::new());
        }
        let map = save_data
            .as_object_mut()
            .ok_or_else(|| WatermarkError::serde("save data must be a JSON object"))?;
        let value = serde_json::to_value(self)
            .map_err(|e| WatermarkError::serde(format!("encode overlay settings: {e}")))?;
        map.insert(SAVE_KEY.to_string(), value);
        Ok(())
    }

    /// Read from the frontend's save data; `None` when nothing was saved yet.
    pub fn load(save_data: &serde_json::Value) -> WatermarkResult<Option<Self>> {
        let Some(value) = save_data.get(SAVE_KEY) else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| WatermarkError::serde(format!("decode overlay settings: {e}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/persist.rs"]
mod tests;
