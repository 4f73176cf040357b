//! In-memory implementation of [`MeshStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and ephemeral
//! sessions. It keeps tables in HashMaps with the same semantics as the SQLite
//! backend: node tables get an auto-assigned `pk`, edge tables are unique on
//! `(pk1, pk2)`, unknown tables and columns are errors.
//!
//! Tables sit behind a `Mutex` so the store is `Sync` and can be shared
//! across threads. It also counts executed selections, which lets tests check
//! how often the engine goes to the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use nodemesh_core::{EdgeKey, EdgeTable, NodeType, Pk, Row, Selection, Value};

use crate::error::StorageError;
use crate::traits::MeshStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Node,
    Edge,
}

#[derive(Debug, Clone)]
struct MemTable {
    kind: TableKind,
    columns: Vec<String>,
    rows: Vec<Row>,
    next_pk: i64,
}

impl MemTable {
    fn new(kind: TableKind, columns: Vec<String>) -> Self {
        MemTable {
            kind,
            columns,
            rows: Vec::new(),
            next_pk: 1,
        }
    }

    fn check_columns<'a>(
        &self,
        table: &str,
        names: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), StorageError> {
        for name in names {
            if !self.columns.contains(name) {
                return Err(StorageError::UnknownColumn {
                    table: table.to_string(),
                    column: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// A full row: every column present, `Null` where not given.
    fn complete(&self, values: &Row) -> Row {
        self.columns
            .iter()
            .map(|c| (c.clone(), values.get(c).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    fn edge_position(&self, key: &EdgeKey) -> Option<usize> {
        let pk1 = Value::from(key.pk1);
        let pk2 = Value::from(key.pk2);
        self.rows
            .iter()
            .position(|r| r.get("pk1") == Some(&pk1) && r.get("pk2") == Some(&pk2))
    }
}

/// In-memory implementation of [`MeshStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<HashMap<String, MemTable>>,
    selects: AtomicUsize,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a node table. A `pk` column is added in front of `columns`.
    pub fn define_node_table(&self, node_type: &NodeType, columns: &[&str]) {
        let mut all = vec!["pk".to_string()];
        all.extend(columns.iter().map(|c| c.to_string()));
        self.lock()
            .insert(node_type.to_string(), MemTable::new(TableKind::Node, all));
    }

    /// Declares an edge table. `pk1` and `pk2` are added in front of `columns`.
    pub fn define_edge_table(&self, table: &EdgeTable, columns: &[&str]) {
        let mut all = vec!["pk1".to_string(), "pk2".to_string()];
        all.extend(columns.iter().map(|c| c.to_string()));
        self.lock()
            .insert(table.name(), MemTable::new(TableKind::Edge, all));
    }

    /// All rows of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Number of selections executed so far.
    pub fn select_count(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemTable>> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn table_mut<'a>(
    tables: &'a mut HashMap<String, MemTable>,
    name: &str,
    kind: TableKind,
) -> Result<&'a mut MemTable, StorageError> {
    match tables.get_mut(name) {
        Some(t) if t.kind == kind => Ok(t),
        _ => Err(StorageError::TableNotFound {
            table: name.to_string(),
        }),
    }
}

impl MeshStore for InMemoryStore {
    fn columns(&self, table: &str) -> Result<Option<Vec<String>>, StorageError> {
        Ok(self.lock().get(table).map(|t| t.columns.clone()))
    }

    fn select(&self, selection: &Selection) -> Result<Vec<Row>, StorageError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        let tables = self.lock();
        let name = selection.node_type.as_str();
        let table = tables.get(name).ok_or_else(|| StorageError::TableNotFound {
            table: name.to_string(),
        })?;
        table.check_columns(name, selection.predicates.iter().map(|p| &p.column))?;
        let matching = table.rows.iter().filter(|row| {
            selection
                .predicates
                .iter()
                .all(|p| row.get(&p.column) == Some(&p.value))
        });
        Ok(match selection.limit {
            Some(n) => matching.take(n).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }

    fn insert_row(&self, node_type: &NodeType, values: &Row) -> Result<Pk, StorageError> {
        let mut tables = self.lock();
        let name = node_type.as_str();
        let table = table_mut(&mut tables, name, TableKind::Node)?;
        table.check_columns(name, values.keys())?;
        let pk = match values.get("pk").and_then(Value::as_i64) {
            Some(given) => {
                if table.rows.iter().any(|r| r.get("pk") == Some(&Value::Integer(given))) {
                    return Err(StorageError::Constraint {
                        table: name.to_string(),
                        reason: format!("duplicate pk {given}"),
                    });
                }
                given
            }
            None => table.next_pk,
        };
        table.next_pk = table.next_pk.max(pk + 1);
        let mut row = table.complete(values);
        row.insert("pk".to_string(), Value::Integer(pk));
        table.rows.push(row);
        Ok(Pk(pk))
    }

    fn update_row(
        &self,
        node_type: &NodeType,
        pk: Pk,
        values: &Row,
    ) -> Result<usize, StorageError> {
        let mut tables = self.lock();
        let name = node_type.as_str();
        let table = table_mut(&mut tables, name, TableKind::Node)?;
        table.check_columns(name, values.keys())?;
        let target = Value::from(pk);
        let mut affected = 0;
        for row in table.rows.iter_mut().filter(|r| r.get("pk") == Some(&target)) {
            for (k, v) in values {
                row.insert(k.clone(), v.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    fn find_edge(&self, key: &EdgeKey) -> Result<Option<Row>, StorageError> {
        let mut tables = self.lock();
        let table = table_mut(&mut tables, &key.table.name(), TableKind::Edge)?;
        Ok(table.edge_position(key).map(|i| table.rows[i].clone()))
    }

    fn insert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError> {
        let name = key.table.name();
        let mut tables = self.lock();
        let table = table_mut(&mut tables, &name, TableKind::Edge)?;
        table.check_columns(&name, attributes.keys())?;
        if table.edge_position(key).is_some() {
            return Err(StorageError::Constraint {
                table: name,
                reason: format!("duplicate edge ({}, {})", key.pk1, key.pk2),
            });
        }
        let mut row = table.complete(attributes);
        row.insert("pk1".to_string(), Value::from(key.pk1));
        row.insert("pk2".to_string(), Value::from(key.pk2));
        table.rows.push(row);
        Ok(())
    }

    fn update_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<usize, StorageError> {
        let name = key.table.name();
        let mut tables = self.lock();
        let table = table_mut(&mut tables, &name, TableKind::Edge)?;
        table.check_columns(&name, attributes.keys())?;
        match table.edge_position(key) {
            Some(i) => {
                for (k, v) in attributes {
                    table.rows[i].insert(k.clone(), v.clone());
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn upsert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError> {
        let name = key.table.name();
        let mut tables = self.lock();
        let table = table_mut(&mut tables, &name, TableKind::Edge)?;
        table.check_columns(&name, attributes.keys())?;
        match table.edge_position(key) {
            Some(i) => {
                for (k, v) in attributes {
                    table.rows[i].insert(k.clone(), v.clone());
                }
            }
            None => {
                let mut row = table.complete(attributes);
                row.insert("pk1".to_string(), Value::from(key.pk1));
                row.insert("pk2".to_string(), Value::from(key.pk2));
                table.rows.push(row);
            }
        }
        Ok(())
    }

    fn delete_edge(&self, key: &EdgeKey) -> Result<usize, StorageError> {
        let name = key.table.name();
        let mut tables = self.lock();
        let table = table_mut(&mut tables, &name, TableKind::Edge)?;
        match table.edge_position(key) {
            Some(i) => {
                table.rows.remove(i);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
