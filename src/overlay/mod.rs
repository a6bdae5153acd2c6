//! Overlay configuration holder and the renderer-facing contract.

pub(crate) mod image;
pub(crate) mod persist;
pub(crate) mod settings;
