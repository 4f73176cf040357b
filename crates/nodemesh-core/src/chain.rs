//! Chain contexts: the append-only record of how a node was reached.
//!
//! A chain starts with a node type and accumulates steps. A chain built for a
//! whole type carries the [`ChainStep::Virtual`] marker, so it denotes every
//! node of that type rather than one unresolved instance. Resolving a chain
//! yields a [`Selection`], which is what the store executes.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::{validate_column, NodeType, Pk};
use crate::value::Value;

/// One step of a chain context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChainStep {
    /// Names the node type (table) the chain ranges over.
    Type(NodeType),
    /// "Not yet filtered": the chain denotes the set of all nodes of its type.
    Virtual,
    /// Pins the chain to one row.
    Pk(Pk),
    /// Equality filter on a column.
    Where { column: String, value: Value },
    /// Caps the number of rows returned.
    Limit(usize),
}

/// Equality predicate produced by resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub value: Value,
}

/// A resolved chain: what rows to select from which table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub node_type: NodeType,
    pub predicates: Vec<Predicate>,
    pub limit: Option<usize>,
}

impl Selection {
    /// True when no predicate narrows the selection.
    pub fn is_unfiltered(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Append-only sequence of [`ChainStep`]s.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainContext {
    steps: Vec<ChainStep>,
}

impl ChainContext {
    /// A chain over every node of `node_type`.
    pub fn set(node_type: NodeType) -> Self {
        ChainContext {
            steps: vec![ChainStep::Type(node_type), ChainStep::Virtual],
        }
    }

    /// A chain pinned to the row `pk` of `node_type`.
    pub fn node(node_type: NodeType, pk: Pk) -> Self {
        ChainContext {
            steps: vec![ChainStep::Type(node_type), ChainStep::Pk(pk)],
        }
    }

    /// Builds a chain from raw steps.
    pub fn from_steps(steps: Vec<ChainStep>) -> Self {
        ChainContext { steps }
    }

    pub fn push(&mut self, step: ChainStep) {
        self.steps.push(step);
    }

    /// Returns a copy of this chain with `step` appended.
    pub fn with(&self, step: ChainStep) -> Self {
        let mut next = self.clone();
        next.push(step);
        next
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// The node type named by the first step, if any.
    pub fn node_type(&self) -> Option<&NodeType> {
        match self.steps.first() {
            Some(ChainStep::Type(t)) => Some(t),
            _ => None,
        }
    }

    /// The last pinned primary key, if any.
    pub fn pk(&self) -> Option<Pk> {
        self.steps.iter().rev().find_map(|s| match s {
            ChainStep::Pk(pk) => Some(*pk),
            _ => None,
        })
    }

    /// True when the chain still denotes a whole set: it carries the virtual
    /// marker and nothing after it narrows the selection.
    pub fn is_virtual(&self) -> bool {
        let mut virtual_seen = false;
        for step in &self.steps {
            match step {
                ChainStep::Virtual => virtual_seen = true,
                ChainStep::Pk(_) | ChainStep::Where { .. } => return false,
                _ => {}
            }
        }
        virtual_seen
    }

    /// Resolves the chain into a [`Selection`].
    ///
    /// The virtual marker contributes no predicate. A pinned key becomes a
    /// `pk` predicate; only the last pinned key counts, and it replaces the
    /// filters before it.
    pub fn resolve(&self) -> Result<Selection, CoreError> {
        let node_type = self.node_type().cloned().ok_or(CoreError::UntypedChain)?;
        let mut predicates = Vec::new();
        let mut limit = None;
        for step in self.steps.iter().skip(1) {
            match step {
                ChainStep::Type(_) => return Err(CoreError::UntypedChain),
                ChainStep::Virtual => {}
                ChainStep::Pk(_) => predicates.clear(),
                ChainStep::Where { column, value } => {
                    validate_column(column)?;
                    predicates.push(Predicate {
                        column: column.clone(),
                        value: value.clone(),
                    });
                }
                ChainStep::Limit(n) => limit = Some(*n),
            }
        }
        if let Some(pk) = self.pk() {
            predicates.insert(
                0,
                Predicate {
                    column: "pk".to_string(),
                    value: Value::Integer(pk.0),
                },
            );
        }
        Ok(Selection {
            node_type,
            predicates,
            limit,
        })
    }
}
