//! Core data model for the nodemesh graph-over-relational engine.
//!
//! - [`id`]: validated node types and integer keys
//! - [`value`]: column values and rows
//! - [`chain`]: chain contexts and their resolution into selections
//! - [`edge`]: edge table naming, canonical ordering, link direction
//! - [`error`]: CoreError

pub mod chain;
pub mod edge;
pub mod error;
pub mod id;
pub mod value;

// Re-export commonly used types
pub use chain::{ChainContext, ChainStep, Predicate, Selection};
pub use edge::{Direction, EdgeKey, EdgeTable, Endpoint, Orientation, StoredDirection};
pub use error::CoreError;
pub use id::{ContextId, NodeType, Pk};
pub use value::{Row, Value};
