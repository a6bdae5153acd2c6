//! Contracts the compositor expects from the host application, plus an in-memory implementation.

pub(crate) mod catalog;
pub(crate) mod memory;
pub(crate) mod scene;
pub(crate) mod source;
