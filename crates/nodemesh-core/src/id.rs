//! Identifier newtypes for mesh entities.
//!
//! [`NodeType`] names both a relational table and a vertex kind, so it is
//! validated on construction: only identifiers that are safe to interpolate as
//! quoted SQL names are accepted. [`Pk`] and [`ContextId`] wrap the integer
//! surrogate keys the backing store generates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Longest identifier accepted for node types and column names.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Checks that `name` is a plain identifier: ASCII letters, digits and `_`,
/// not starting with a digit.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= MAX_IDENTIFIER_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a column name before it is placed in a statement.
pub fn validate_column(name: &str) -> Result<(), CoreError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(CoreError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// The type of a node: a table name and a vertex kind at once.
///
/// Bare numbers are never node types, which is what lets link operations
/// reject primary-key-only references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeType(String);

impl NodeType {
    /// Creates a node type, rejecting anything that is not a plain identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if is_identifier(&name) {
            Ok(NodeType(name))
        } else {
            Err(CoreError::InvalidNodeType { name })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NodeType::new(value)
    }
}

impl TryFrom<&str> for NodeType {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        NodeType::new(value)
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.0
    }
}

impl AsRef<str> for NodeType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Integer surrogate key of a persisted node row.
///
/// The inner `i64` aligns with SQLite's `INTEGER PRIMARY KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pk(pub i64);

/// Identifier of a context row, written to a node's `context` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub i64);

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Pk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(NodeType::new("person").is_ok());
        assert!(NodeType::new("_draft_2").is_ok());
        assert!(NodeType::new("Company").is_ok());
    }

    #[test]
    fn rejects_numeric_and_unsafe_names() {
        for bad in ["", "42", "9lives", "person#company", "a b", "x;drop", "name\""] {
            assert!(
                matches!(NodeType::new(bad), Err(CoreError::InvalidNodeType { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(NodeType::new(long).is_err());
        assert!(NodeType::new("a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn column_validation() {
        assert!(validate_column("pk1").is_ok());
        assert!(matches!(
            validate_column("pk1 = 1 OR 1"),
            Err(CoreError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn node_type_serde_validates() {
        let t: NodeType = serde_json::from_str("\"person\"").unwrap();
        assert_eq!(t.as_str(), "person");
        assert!(serde_json::from_str::<NodeType>("\"12\"").is_err());
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Pk(7)), "7");
        assert_eq!(format!("{}", ContextId(3)), "3");
        assert_eq!(NodeType::new("person").unwrap().to_string(), "person");
    }
}
