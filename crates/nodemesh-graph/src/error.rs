//! Engine error types.
//!
//! [`MeshError`] is the unified error of the graph layer. Storage and core
//! errors convert in via `#[from]`; link writes and lookups keep the edge they
//! were working on; commit failures wrap their cause so the caller sees both
//! which node failed and why.

use nodemesh_core::{CoreError, EdgeKey, NodeType};
use nodemesh_storage::StorageError;
use thiserror::Error;

/// Errors produced by node, link and commit operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// A commit resolved to more than one context.
    #[error("cannot create node with ambiguous context ({count} contexts)")]
    AmbiguousContext { count: usize },

    /// A field is neither a column nor a known node type.
    #[error("cannot link {node_type} with {field} because type {field} doesn't exist")]
    UnknownRelationTarget { node_type: NodeType, field: String },

    /// A link target was given as a bare primary key.
    #[error("link operations based on pks are not allowed because the node type cannot be determined")]
    PkLinkRejected,

    /// A `direction` link attribute other than `forward` or `reverse`.
    #[error("invalid link direction '{value}'")]
    InvalidLinkDirection { value: String },

    /// Writing an edge row failed.
    #[error("could not link nodes at {key}: {source}")]
    LinkWrite {
        key: EdgeKey,
        #[source]
        source: StorageError,
    },

    /// Checking whether an edge row exists failed.
    #[error("could not find link at {key}: {source}")]
    LinkLookup {
        key: EdgeKey,
        #[source]
        source: StorageError,
    },

    /// A store failure, unchanged.
    #[error(transparent)]
    Store(#[from] StorageError),

    /// `me` was called with filters.
    #[error("a single {node_type} node cannot be filtered")]
    SingletonFilter { node_type: NodeType },

    /// A commit aborted; `source` is the step that failed.
    #[error("commit of {node_type} failed: {source}")]
    Commit {
        node_type: NodeType,
        #[source]
        source: Box<MeshError>,
    },

    /// The operation needs a persisted node.
    #[error("{node_type} node has no primary key")]
    UnpersistedNode { node_type: NodeType },

    /// A field value does not fit the field's classification.
    #[error("invalid value for {node_type}.{field}: {reason}")]
    InvalidFieldValue {
        node_type: NodeType,
        field: String,
        reason: &'static str,
    },

    /// A relation field holds nodes of another type.
    #[error("relation '{field}' expects {expected} nodes, got {found}")]
    RelationTypeMismatch {
        field: String,
        expected: NodeType,
        found: NodeType,
    },

    /// A link attribute is not a column of the edge table.
    #[error("no column '{attribute}' on edge table {table}")]
    UnknownLinkAttribute { table: String, attribute: String },

    /// A context resolved for a type that has no context column.
    #[error("{node_type} has no '{column}' column to store a context")]
    ContextUnsupported { node_type: NodeType, column: String },

    /// Identifier or chain validation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MeshError {
    /// The innermost error, looking through commit wrappers.
    pub fn root_cause(&self) -> &MeshError {
        let mut err = self;
        while let MeshError::Commit { source, .. } = err {
            err = source;
        }
        err
    }
}
