//! Storage adapters for normalized route features
//!
//! The [`ports::FeatureStore`] trait decouples the ingest pipeline and the
//! renderers from any concrete backend. Two adapters are provided: an
//! in-memory store (hash maps plus an R-tree) for development and tests, and
//! a PostgreSQL/PostGIS store for production deployments.

pub mod memory;
pub mod ports;
pub mod postgres;

pub use memory::MemoryStore;
pub use ports::{FeatureQuery, FeatureStore};
pub use postgres::{PostgresConfig, PostgresStore};
