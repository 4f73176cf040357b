//! Per-node state cache.

use nodemesh_core::{Row, Value};

/// Attribute values a node has fetched or been assigned.
///
/// Owned by exactly one [`crate::Node`]. It may be empty, partially populated
/// (after a commit wrote some columns), or materialized (after a fetch
/// returned the full row). Populating merges: later values win per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateCache {
    data: Row,
    materialized: bool,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `row` into the cache.
    pub fn populate(&mut self, row: &Row) {
        for (k, v) in row {
            self.data.insert(k.clone(), v.clone());
        }
    }

    /// Merges a full row read from the store.
    pub fn materialize(&mut self, row: &Row) {
        self.populate(row);
        self.materialized = true;
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.data.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    pub fn data(&self) -> &Row {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True once a fetched row has been merged in.
    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.materialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn populate_merges_partial_rows() {
        let mut cache = StateCache::new();
        assert!(cache.is_empty());
        cache.populate(&row(&[("name", "Ana".into())]));
        cache.populate(&row(&[("age", 31.into()), ("name", "Ana B".into())]));
        assert_eq!(cache.get("name"), Some(&Value::from("Ana B")));
        assert_eq!(cache.data().len(), 2);
        assert!(!cache.is_materialized());
    }

    #[test]
    fn materialize_and_clear() {
        let mut cache = StateCache::new();
        cache.materialize(&row(&[("pk", 1.into())]));
        assert!(cache.is_materialized());
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_materialized());
    }
}
