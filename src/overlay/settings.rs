use std::path::{Path, PathBuf};

use crate::foundation::core::Point;
use crate::foundation::error::{WatermarkError, WatermarkResult};
use crate::overlay::image::{ImageSize, OverlayPlacement};

/// Host type id of the overlay renderer.
pub const OVERLAY_SOURCE_TYPE: &str = "overlay_source";

/// Name given to the private overlay source.
pub const OVERLAY_SOURCE_NAME: &str = "__watermark";

/// Image extensions offered by the file picker.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Renderer blob keys.
pub(crate) mod keys {
    pub const FILE: &str = "file";
    pub const SCALE: &str = "scale";
    pub const POS_X: &str = "pos.x";
    pub const POS_Y: &str = "pos.y";
    pub const OPACITY: &str = "opacity";
    pub const IMAGE_WIDTH: &str = "imgcx";
    pub const IMAGE_HEIGHT: &str = "imgcy";
}

/// User-facing overlay configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlaySettings {
    /// Image file; empty draws nothing.
    #[serde(default)]
    pub file: PathBuf,
    /// Top-left corner in output pixels.
    #[serde(default = "default_position")]
    pub position: Point,
    /// Uniform scale applied to the image's intrinsic size.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Opacity in `[0, 1]`, applied by the post-filter.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_position() -> Point {
    Point::ZERO
}

fn default_scale() -> f64 {
    1.0
}

fn default_opacity() -> f32 {
    1.0
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            position: default_position(),
            scale: default_scale(),
            opacity: default_opacity(),
        }
    }
}

impl OverlaySettings {
    /// Check value ranges and the file extension.
    pub fn validate(&self) -> WatermarkResult<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(WatermarkError::validation(format!(
                "scale must be finite and > 0, got {}",
                self.scale
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::validation(format!(
                "opacity must be within [0, 1], got {}",
                self.opacity
            )));
        }
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            return Err(WatermarkError::validation("position must be finite"));
        }
        if !self.file.as_os_str().is_empty() && !is_supported_image(&self.file) {
            return Err(WatermarkError::validation(format!(
                "unsupported image '{}' (expected one of {})",
                self.file.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        Ok(())
    }

    /// Placement part of the settings.
    pub fn placement(&self) -> OverlayPlacement {
        OverlayPlacement {
            position: self.position,
            scale: self.scale,
            opacity: self.opacity,
        }
    }

    /// Renderer configuration blob for these settings.
    pub fn to_blob(&self) -> serde_json::Value {
        let mut blob = serde_json::Value::Object(serde_json::Map::new());
        self.write_into(&mut blob);
        blob
    }

    /// Overwrite the user-controlled keys of `blob`, keeping renderer-reported values.
    pub fn write_into(&self, blob: &mut serde_json::Value) {
        if !blob.is_object() {
            *blob = serde_json::Value::Object(serde_json::Map::new());
        }
        let Some(map) = blob.as_object_mut() else {
            return;
        };
        map.insert(
            keys::FILE.to_string(),
            self.file.to_string_lossy().into_owned().into(),
        );
        map.insert(keys::SCALE.to_string(), self.scale.into());
        map.insert(keys::POS_X.to_string(), (self.position.x.round() as i64).into());
        map.insert(keys::POS_Y.to_string(), (self.position.y.round() as i64).into());
        map.insert(keys::OPACITY.to_string(), f64::from(self.opacity).into());
    }

    /// Read settings back from a renderer blob; missing keys take their defaults.
    pub fn from_blob(blob: &serde_json::Value) -> WatermarkResult<Self> {
        let map = blob
            .as_object()
            .ok_or_else(|| WatermarkError::serde("overlay blob must be an object"))?;
        let mut out = Self::default();
        if let Some(v) = map.get(keys::FILE) {
            out.file = PathBuf::from(blob_str(v, keys::FILE)?);
        }
        if let Some(v) = map.get(keys::SCALE) {
            out.scale = blob_f64(v, keys::SCALE)?;
        }
        if let Some(v) = map.get(keys::POS_X) {
            out.position.x = blob_f64(v, keys::POS_X)?;
        }
        if let Some(v) = map.get(keys::POS_Y) {
            out.position.y = blob_f64(v, keys::POS_Y)?;
        }
        if let Some(v) = map.get(keys::OPACITY) {
            out.opacity = blob_f64(v, keys::OPACITY)? as f32;
        }
        Ok(out)
    }
}

/// Record the renderer-reported image size in `blob`.
pub fn write_intrinsic_size(blob: &mut serde_json::Value, size: ImageSize) {
    if let Some(map) = blob.as_object_mut() {
        map.insert(keys::IMAGE_WIDTH.to_string(), size.width.into());
        map.insert(keys::IMAGE_HEIGHT.to_string(), size.height.into());
    }
}

/// Image size previously recorded in `blob`, if any.
pub fn read_intrinsic_size(blob: &serde_json::Value) -> Option<ImageSize> {
    let width = blob.get(keys::IMAGE_WIDTH)?.as_u64()?;
    let height = blob.get(keys::IMAGE_HEIGHT)?.as_u64()?;
    Some(ImageSize {
        width: u32::try_from(width).ok()?,
        height: u32::try_from(height).ok()?,
    })
}

/// Whether `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

fn blob_str<'a>(v: &'a serde_json::Value, key: &str) -> WatermarkResult<&'a str> {
    v.as_str()
        .ok_or_else(|| WatermarkError::serde(format!("overlay blob '{key}' must be a string")))
}

fn blob_f64(v: &serde_json::Value, key: &str) -> WatermarkResult<f64> {
    v.as_f64()
        .ok_or_else(|| WatermarkError::serde(format!("overlay blob '{key}' must be a number")))
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/settings.rs"]
mod tests;
