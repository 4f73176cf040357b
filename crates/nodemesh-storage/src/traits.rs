//! The storage contracts the mesh engine consumes.
//!
//! - [`MeshStore`] executes selections, reports table schemas, and writes node
//!   and edge rows. Every value travels as a bound parameter; identifiers are
//!   node types and validated column names only.
//! - [`ContextResolver`] maps context names to context row ids.
//!
//! Both backends ([`crate::InMemoryStore`], [`crate::SqliteStore`]) implement
//! [`MeshStore`] with identical semantics so they are swappable without
//! changing engine logic.

use std::sync::Arc;

use nodemesh_core::{ContextId, EdgeKey, NodeType, Pk, Row, Selection};

use crate::error::StorageError;

/// The storage contract for node and edge rows.
///
/// Methods take `&self`: backends own their connection or guard their tables
/// internally. Calls are synchronous and blocking.
pub trait MeshStore {
    // -------------------------------------------------------------------
    // Schema
    // -------------------------------------------------------------------

    /// Column names of `table` in declaration order, or `None` when the table
    /// does not exist.
    fn columns(&self, table: &str) -> Result<Option<Vec<String>>, StorageError>;

    // -------------------------------------------------------------------
    // Node rows
    // -------------------------------------------------------------------

    /// Executes a resolved chain context.
    fn select(&self, selection: &Selection) -> Result<Vec<Row>, StorageError>;

    /// Inserts a node row and returns the generated key.
    fn insert_row(&self, node_type: &NodeType, values: &Row) -> Result<Pk, StorageError>;

    /// Updates the given columns of the row `pk`. Returns rows affected.
    fn update_row(&self, node_type: &NodeType, pk: Pk, values: &Row)
        -> Result<usize, StorageError>;

    // -------------------------------------------------------------------
    // Edge rows
    // -------------------------------------------------------------------

    /// Fetches the edge row at `key`, if present.
    fn find_edge(&self, key: &EdgeKey) -> Result<Option<Row>, StorageError>;

    /// Inserts a new edge row with `pk1`, `pk2` and `attributes`.
    fn insert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError>;

    /// Updates the non-key columns of the edge row. Returns rows affected.
    fn update_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<usize, StorageError>;

    /// Inserts the edge row, or updates its attributes when `(pk1, pk2)`
    /// already exists, in one store-level step.
    fn upsert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError>;

    /// Deletes the edge row. Returns rows affected; zero is not an error.
    fn delete_edge(&self, key: &EdgeKey) -> Result<usize, StorageError>;
}

/// Resolves context names to the context ids a node is created in.
pub trait ContextResolver {
    /// All ids registered under `name`. Fails with
    /// [`StorageError::ContextNotFound`] when there are none.
    fn resolve(&self, name: &str) -> Result<Vec<ContextId>, StorageError>;

    /// The default context set for new nodes; may be empty.
    fn default_context(&self) -> Result<Vec<ContextId>, StorageError>;
}

// A shared backend can serve as both store and context resolver.

impl<T: MeshStore + ?Sized> MeshStore for Arc<T> {
    fn columns(&self, table: &str) -> Result<Option<Vec<String>>, StorageError> {
        (**self).columns(table)
    }

    fn select(&self, selection: &Selection) -> Result<Vec<Row>, StorageError> {
        (**self).select(selection)
    }

    fn insert_row(&self, node_type: &NodeType, values: &Row) -> Result<Pk, StorageError> {
        (**self).insert_row(node_type, values)
    }

    fn update_row(
        &self,
        node_type: &NodeType,
        pk: Pk,
        values: &Row,
    ) -> Result<usize, StorageError> {
        (**self).update_row(node_type, pk, values)
    }

    fn find_edge(&self, key: &EdgeKey) -> Result<Option<Row>, StorageError> {
        (**self).find_edge(key)
    }

    fn insert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError> {
        (**self).insert_edge(key, attributes)
    }

    fn update_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<usize, StorageError> {
        (**self).update_edge(key, attributes)
    }

    fn upsert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError> {
        (**self).upsert_edge(key, attributes)
    }

    fn delete_edge(&self, key: &EdgeKey) -> Result<usize, StorageError> {
        (**self).delete_edge(key)
    }
}

impl<T: ContextResolver + ?Sized> ContextResolver for Arc<T> {
    fn resolve(&self, name: &str) -> Result<Vec<ContextId>, StorageError> {
        (**self).resolve(name)
    }

    fn default_context(&self) -> Result<Vec<ContextId>, StorageError> {
        (**self).default_context()
    }
}
