//! Storage backends for the nodemesh engine.
//!
//! Provides the [`MeshStore`] trait defining the storage contract the engine
//! consumes, the [`ContextResolver`] contract for context lookup, and two
//! first-class backends: [`InMemoryStore`] and [`SqliteStore`].
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: MeshStore and ContextResolver trait definitions
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: connection setup and bookkeeping migrations
//! - [`sqlite`]: SqliteStore implementation
//! - [`context`]: StaticContexts, a configuration-fed resolver

pub mod context;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use context::StaticContexts;
pub use error::StorageError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ContextResolver, MeshStore};
