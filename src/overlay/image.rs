use std::path::Path;

use anyhow::Context;

use crate::foundation::core::{Point, Rect};
use crate::foundation::error::WatermarkResult;

/// Intrinsic pixel size of an overlay image.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// A zero-sized image draws nothing.
    pub fn is_empty(self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// Read the intrinsic size of the image at `path` without decoding its pixels.
#[tracing::instrument]
pub fn probe_image_size(path: &Path) -> WatermarkResult<ImageSize> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("probe image '{}'", path.display()))?;
    Ok(ImageSize { width, height })
}

/// Where and how the overlay is drawn on the output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayPlacement {
    /// Top-left corner in output pixels.
    pub position: Point,
    /// Uniform scale applied to the intrinsic size.
    pub scale: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
}

impl OverlayPlacement {
    /// Output rectangle covered by an image of `size`; `None` when nothing is drawn.
    ///
    /// Scaled dimensions truncate toward zero, matching the renderer's sprite size.
    pub fn draw_rect(&self, size: ImageSize) -> Option<Rect> {
        if size.is_empty() || self.opacity <= 0.0 {
            return None;
        }
        let w = (f64::from(size.width) * self.scale).trunc();
        let h = (f64::from(size.height) * self.scale).trunc();
        Some(Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + w,
            self.position.y + h,
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/image.rs"]
mod tests;
