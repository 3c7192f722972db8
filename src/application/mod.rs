//! Application layer: rendering and table-of-contents synchronisation.

pub mod error;
pub mod render;
pub mod toc;
