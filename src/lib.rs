//! Markdown article rendering with a scroll-synchronised table of contents.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
