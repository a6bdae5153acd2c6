use crate::foundation::error::{WatermarkError, WatermarkResult};

pub use kurbo::{Point, Rect};

/// Output channel used when nothing else is configured.
pub const DEFAULT_CHANNEL: Channel = Channel(7);

/// Duration applied to roles that were never given one.
pub const DEFAULT_DURATION: DurationMs = DurationMs(300);

/// Slot index on the host's output mixer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Channel(pub u32);

impl Default for Channel {
    fn default() -> Self {
        DEFAULT_CHANNEL
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// Animation duration in milliseconds.
///
/// Deserializes from any integer through [`DurationMs::from_host`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "i64")]
pub struct DurationMs(pub u32);

impl DurationMs {
    /// Build a duration from a signed host value, rejecting negatives.
    pub fn from_host(ms: i64) -> WatermarkResult<Self> {
        u32::try_from(ms)
            .map(Self)
            .map_err(|_| WatermarkError::validation(format!("duration {ms}ms is out of range")))
    }

    /// Raw millisecond count.
    pub fn as_millis(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for DurationMs {
    type Error = WatermarkError;

    fn try_from(ms: i64) -> Result<Self, Self::Error> {
        Self::from_host(ms)
    }
}

impl Default for DurationMs {
    fn default() -> Self {
        DEFAULT_DURATION
    }
}

impl std::fmt::Display for DurationMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
