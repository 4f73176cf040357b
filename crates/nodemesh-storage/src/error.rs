//! Storage error types for nodemesh-storage.
//!
//! [`StorageError`] covers the failure modes of the backing store: statement
//! failures (carrying the attempted statement), missing tables and columns,
//! constraint violations, context lookups, and migration failures.

use nodemesh_core::CoreError;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A SQLite call failed outside of a specific statement (open, pragma).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A statement failed; the statement text is kept for diagnosis.
    #[error("query failed: {statement}: {source}")]
    Query {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// An identifier or chain failed core validation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The table does not exist.
    #[error("table not found: {table}")]
    TableNotFound { table: String },

    /// The column does not exist on the table.
    #[error("no column '{column}' on table {table}")]
    UnknownColumn { table: String, column: String },

    /// A write violated a uniqueness constraint.
    #[error("constraint violation on {table}: {reason}")]
    Constraint { table: String, reason: String },

    /// A named context has no rows.
    #[error("context not found: {name}")]
    ContextNotFound { name: String },
}
