//! RouteAtlas Core - Domain models, configuration, manifest parsing, and format readers
//!
//! This crate holds everything the other RouteAtlas crates agree on: the
//! canonical geometry and feature models, layered configuration, the
//! dependency manifest parser, and the pluggable format readers that turn
//! files on disk into features.

pub mod config;
pub mod error;
pub mod formats;
pub mod manifest;
pub mod models;

pub use error::{AtlasError, Result};
