//! Attribute classification.
//!
//! A field of a node is an *attribute* when its node type's table has a column
//! of that name. Anything else is a *relation*, and must name another node
//! type. The decision depends only on the schema, never on the value a caller
//! passes.
//!
//! Table schemas are introspected once and kept in a [`SchemaRegistry`]
//! shared by every node of a [`crate::Mesh`]. Entries stay until explicitly
//! invalidated. Missing tables are never cached, so a table created later is
//! seen on the next lookup.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::debug;

use nodemesh_core::{NodeType, Row};
use nodemesh_storage::{MeshStore, StorageError};

use crate::cluster::LinkTarget;
use crate::error::MeshError;
use crate::node::{FieldValue, Node};

/// Column set of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<String>,
    lookup: HashSet<String>,
}

impl TableSchema {
    pub fn new(columns: Vec<String>) -> Self {
        let lookup = columns.iter().cloned().collect();
        TableSchema { columns, lookup }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains(name)
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// How one field of a node type is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A column on the node's own table.
    Attribute,
    /// An edge to nodes of the named type.
    Relation(NodeType),
}

/// The outcome of splitting commit fields.
#[derive(Debug, Clone, Default)]
pub struct SplitFields {
    /// Column values for the node's own row.
    pub attributes: Row,
    /// Nodes to link, keyed by relation type.
    pub relations: IndexMap<NodeType, Vec<Node>>,
}

/// Process-wide cache of table schemas, keyed by table name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: DashMap<String, Arc<TableSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schema of `table`, introspecting the store on first use. `None`
    /// when the table does not exist.
    pub fn schema<S: MeshStore>(
        &self,
        store: &S,
        table: &str,
    ) -> Result<Option<Arc<TableSchema>>, StorageError> {
        if let Some(schema) = self.tables.get(table) {
            return Ok(Some(Arc::clone(schema.value())));
        }
        debug!(table, "schema cache miss");
        let Some(columns) = store.columns(table)? else {
            return Ok(None);
        };
        let schema = Arc::new(TableSchema::new(columns));
        self.tables.insert(table.to_string(), Arc::clone(&schema));
        Ok(Some(schema))
    }

    /// True when `field` is a column of `node_type`'s table.
    pub fn is_attribute<S: MeshStore>(
        &self,
        store: &S,
        node_type: &NodeType,
        field: &str,
    ) -> Result<bool, StorageError> {
        Ok(self
            .schema(store, node_type.as_str())?
            .is_some_and(|s| s.has_column(field)))
    }

    /// The node type called `name`, if it is a valid type with a table.
    pub fn node_type<S: MeshStore>(
        &self,
        store: &S,
        name: &str,
    ) -> Result<Option<NodeType>, StorageError> {
        let Ok(node_type) = NodeType::new(name) else {
            return Ok(None);
        };
        Ok(self
            .schema(store, node_type.as_str())?
            .map(|_| node_type))
    }

    /// Classifies one field of `node_type`.
    pub fn classify<S: MeshStore>(
        &self,
        store: &S,
        node_type: &NodeType,
        field: &str,
    ) -> Result<FieldKind, MeshError> {
        if self.is_attribute(store, node_type, field)? {
            return Ok(FieldKind::Attribute);
        }
        match self.node_type(store, field)? {
            Some(target) => Ok(FieldKind::Relation(target)),
            None => Err(MeshError::UnknownRelationTarget {
                node_type: node_type.clone(),
                field: field.to_string(),
            }),
        }
    }

    /// Splits commit fields into column values and relations.
    ///
    /// The input is left untouched. Values must fit their classification: a
    /// column takes a scalar, a relation takes nodes of its type. A bare
    /// integer on a relation is a pk-based link and is rejected.
    pub fn split_fields<S: MeshStore>(
        &self,
        store: &S,
        node_type: &NodeType,
        fields: &IndexMap<String, FieldValue>,
    ) -> Result<SplitFields, MeshError> {
        let mut split = SplitFields::default();
        for (field, value) in fields {
            match self.classify(store, node_type, field)? {
                FieldKind::Attribute => {
                    let FieldValue::Value(v) = value else {
                        return Err(MeshError::InvalidFieldValue {
                            node_type: node_type.clone(),
                            field: field.clone(),
                            reason: "a column takes a scalar value",
                        });
                    };
                    split.attributes.insert(field.clone(), v.clone());
                }
                FieldKind::Relation(target_type) => {
                    let target = match value.as_target() {
                        Some(t) => LinkTarget::try_from(t)?,
                        None => {
                            return Err(MeshError::InvalidFieldValue {
                                node_type: node_type.clone(),
                                field: field.clone(),
                                reason: "a relation takes nodes",
                            })
                        }
                    };
                    let linked = split.relations.entry(target_type.clone()).or_default();
                    for node in target.nodes() {
                        if node.node_type() != &target_type {
                            return Err(MeshError::RelationTypeMismatch {
                                field: field.clone(),
                                expected: target_type,
                                found: node.node_type().clone(),
                            });
                        }
                        linked.push(node.clone());
                    }
                }
            }
        }
        Ok(split)
    }

    /// Drops the cached schema of `table`.
    pub fn invalidate(&self, table: &str) {
        self.tables.remove(table);
    }

    /// Drops every cached schema.
    pub fn invalidate_all(&self) {
        self.tables.clear();
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use nodemesh_core::{EdgeTable, Pk, Value};
    use nodemesh_storage::InMemoryStore;

    use super::*;
    use crate::cluster::Cluster;

    fn t(name: &str) -> NodeType {
        NodeType::new(name).unwrap()
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.define_node_table(&t("person"), &["name", "age"]);
        store.define_node_table(&t("company"), &["name"]);
        store.define_edge_table(&EdgeTable::for_types(&t("person"), &t("company")), &[]);
        store
    }

    #[test]
    fn classifies_by_schema() {
        let store = store();
        let registry = SchemaRegistry::new();
        let person = t("person");
        assert_eq!(registry.classify(&store, &person, "name").unwrap(), FieldKind::Attribute);
        assert_eq!(
            registry.classify(&store, &person, "company").unwrap(),
            FieldKind::Relation(t("company"))
        );
        assert!(matches!(
            registry.classify(&store, &person, "employer"),
            Err(MeshError::UnknownRelationTarget { .. })
        ));
        assert!(matches!(
            registry.classify(&store, &person, "42"),
            Err(MeshError::UnknownRelationTarget { .. })
        ));
    }

    #[test]
    fn schemas_are_cached_until_invalidated() {
        let store = store();
        let registry = SchemaRegistry::new();
        let person = t("person");
        assert!(!registry.is_attribute(&store, &person, "email").unwrap());

        store.define_node_table(&person, &["name", "age", "email"]);
        assert!(!registry.is_attribute(&store, &person, "email").unwrap());

        registry.invalidate("person");
        assert!(registry.is_attribute(&store, &person, "email").unwrap());

        registry.invalidate_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_tables_are_not_cached() {
        let store = store();
        let registry = SchemaRegistry::new();
        assert_eq!(registry.node_type(&store, "tag").unwrap(), None);
        store.define_node_table(&t("tag"), &["label"]);
        assert_eq!(registry.node_type(&store, "tag").unwrap(), Some(t("tag")));
    }

    #[test]
    fn split_leaves_input_untouched() {
        let store = store();
        let registry = SchemaRegistry::new();
        let acme = Node::with_pk(t("company"), Pk(7));
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), FieldValue::from("Ana"));
        fields.insert("company".to_string(), FieldValue::from(acme));

        let split = registry.split_fields(&store, &t("person"), &fields).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(split.attributes.len(), 1);
        assert_eq!(split.attributes["name"], Value::from("Ana"));
        let companies = &split.relations[&t("company")];
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].pk(), Some(Pk(7)));
    }

    #[test]
    fn split_rejects_mismatched_values() {
        let store = store();
        let registry = SchemaRegistry::new();
        let person = t("person");

        let mut fields = IndexMap::new();
        fields.insert("company".to_string(), FieldValue::from(42));
        assert!(matches!(
            registry.split_fields(&store, &person, &fields),
            Err(MeshError::PkLinkRejected)
        ));

        let mut fields = IndexMap::new();
        fields.insert("company".to_string(), FieldValue::from("Acme"));
        assert!(matches!(
            registry.split_fields(&store, &person, &fields),
            Err(MeshError::InvalidFieldValue { .. })
        ));

        let mut fields = IndexMap::new();
        fields.insert(
            "name".to_string(),
            FieldValue::from(Node::with_pk(t("company"), Pk(1))),
        );
        assert!(matches!(
            registry.split_fields(&store, &person, &fields),
            Err(MeshError::InvalidFieldValue { .. })
        ));

        let mut fields = IndexMap::new();
        let cluster: Cluster = std::iter::once(Node::with_pk(person.clone(), Pk(2))).collect();
        fields.insert("company".to_string(), FieldValue::from(cluster));
        assert!(matches!(
            registry.split_fields(&store, &person, &fields),
            Err(MeshError::RelationTypeMismatch { .. })
        ));
    }
}
