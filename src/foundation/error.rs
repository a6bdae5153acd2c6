/// Convenience result type used across the crate.
pub type WatermarkResult<T> = Result<T, WatermarkError>;

/// Top-level error taxonomy for the fallible edges of the crate.
///
/// The compositor itself never fails: catalog and routing misses degrade to documented fallbacks.
/// Errors surface only from configuration, image probing, and host source creation.
#[derive(thiserror::Error, Debug)]
pub enum WatermarkError {
    /// Invalid user-provided settings or configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration file could not be read or applied.
    #[error("config error: {0}")]
    Config(String),

    /// The scene-graph host refused an operation.
    #[error("host error: {0}")]
    Host(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatermarkError {
    /// Build a [`WatermarkError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`WatermarkError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`WatermarkError::Host`] value.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Build a [`WatermarkError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
