//! The engine handle shared by node operations.
//!
//! [`Mesh`] owns the store, the context resolver, the schema registry and the
//! link manager. Nodes are plain values; every operation borrows a `Mesh`.

use std::sync::Arc;

use tracing::{info, warn};

use nodemesh_core::NodeType;
use nodemesh_storage::{ContextResolver, MeshStore, SqliteStore, StaticContexts};

use crate::classifier::SchemaRegistry;
use crate::config::{LinkWriteMode, MeshConfig};
use crate::error::MeshError;
use crate::link::LinkManager;
use crate::node::Node;

/// A SQLite database serving as both store and context resolver.
pub type SqliteMesh = Mesh<Arc<SqliteStore>, Arc<SqliteStore>>;

/// Store, contexts and shared engine state.
pub struct Mesh<S, C = StaticContexts> {
    store: S,
    contexts: C,
    schemas: SchemaRegistry,
    links: LinkManager,
    config: MeshConfig,
}

impl<S: MeshStore, C: ContextResolver> Mesh<S, C> {
    pub fn new(store: S, contexts: C, config: MeshConfig) -> Self {
        if config.link_write == LinkWriteMode::CheckThenWrite {
            warn!("check-then-write link mode: concurrent links of one edge may duplicate it");
        }
        Mesh {
            store,
            contexts,
            schemas: SchemaRegistry::new(),
            links: LinkManager::new(config.link_write),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn contexts(&self) -> &C {
        &self.contexts
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn links(&self) -> &LinkManager {
        &self.links
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// A handle on every node of the type called `name`.
    pub fn nodes(&self, name: &str) -> Result<Node, MeshError> {
        Ok(Node::set(NodeType::new(name)?))
    }
}

impl<S: MeshStore> Mesh<S, StaticContexts> {
    /// A mesh whose contexts come from `config.default_contexts`.
    pub fn with_static_contexts(store: S, config: MeshConfig) -> Self {
        let contexts = config.static_contexts();
        Mesh::new(store, contexts, config)
    }
}

impl SqliteMesh {
    /// Opens the database at `config.db_path`; contexts are read from its
    /// `context` table.
    pub fn open(config: MeshConfig) -> Result<Self, MeshError> {
        let store = Arc::new(SqliteStore::new(&config.db_path)?);
        info!(db_path = %config.db_path, link_write = %config.link_write, "opened mesh");
        Ok(Mesh::new(Arc::clone(&store), store, config))
    }
}
