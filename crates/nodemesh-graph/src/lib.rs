//! Typed graph over a relational store.
//!
//! Every node type is a table; every pair of node types has a join table
//! named `"{lesser}#{greater}"` holding edges between their rows. A
//! [`Node`] splits the fields it commits into column values and relations,
//! caches the row it reads, and links to other nodes one at a time or
//! through a [`Cluster`].
//!
//! # Modules
//!
//! - [`mesh`]: the [`Mesh`] handle owning store, contexts and shared state
//! - [`node`]: the node façade and commit fields
//! - [`cluster`]: clusters and link targets
//! - [`classifier`]: attribute/relation classification and the schema registry
//! - [`link`]: edge persistence with selectable race handling
//! - [`cache`]: per-node state cache
//! - [`config`]: MeshConfig from environment or JSON
//! - [`error`]: MeshError

pub mod cache;
pub mod classifier;
pub mod cluster;
pub mod config;
pub mod error;
pub mod link;
pub mod mesh;
pub mod node;

pub use cache::StateCache;
pub use classifier::{FieldKind, SchemaRegistry, SplitFields, TableSchema};
pub use cluster::{Cluster, LinkTarget, Member, TargetRef};
pub use config::{ConfigError, LinkWriteMode, MeshConfig};
pub use error::MeshError;
pub use link::LinkManager;
pub use mesh::{Mesh, SqliteMesh};
pub use node::{ContextSpec, FieldValue, Fields, Node};
