//! Infrastructure: the headless document surface, telemetry, and errors.

pub mod document;
pub mod error;
pub mod telemetry;
