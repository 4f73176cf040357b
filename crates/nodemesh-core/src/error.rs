//! Core error types for nodemesh-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! identifier validation and chain-context resolution.

use thiserror::Error;

/// Core errors produced by the nodemesh-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The name cannot denote a node type (empty, numeric, or unsafe).
    #[error("invalid node type: '{name}'")]
    InvalidNodeType { name: String },

    /// A column or attribute name is not a plain identifier.
    #[error("invalid identifier: '{name}'")]
    InvalidIdentifier { name: String },

    /// The chain context does not start with a node type.
    #[error("chain context has no node type")]
    UntypedChain,

    /// A link direction other than `forward` or `reverse`.
    #[error("invalid link direction '{value}'")]
    InvalidDirection { value: String },
}
