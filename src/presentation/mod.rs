//! Presentation layer: markup for display collaborators.

pub mod toc;

pub use toc::{ViewError, render_toc, render_toc_titled};
