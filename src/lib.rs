//! Geotagged audio server library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod features;
pub mod geo;
pub mod record_store;
pub mod server;

// Re-export commonly used types for convenience
pub use record_store::{InMemoryRecordStore, PocketBaseStore, RecordStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
