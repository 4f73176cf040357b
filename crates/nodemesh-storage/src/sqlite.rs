//! SQLite implementation of [`MeshStore`] and [`ContextResolver`].
//!
//! [`SqliteStore`] keeps one connection in WAL mode. Values are always bound
//! as parameters; table and column names come from validated node types and
//! schema-checked columns and are quoted with [`quote_ident`]. Every statement
//! failure is reported with the statement text attached.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

use nodemesh_core::{ContextId, EdgeKey, NodeType, Pk, Row, Selection, Value};

use crate::error::StorageError;
use crate::schema::quote_ident;
use crate::traits::{ContextResolver, MeshStore};

/// SQLite-backed implementation of [`MeshStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    /// The underlying connection, for schema setup outside the engine.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Registers a context row and returns its id.
    pub fn add_context(&self, name: &str, is_default: bool) -> Result<ContextId, StorageError> {
        let sql = "INSERT INTO context (name, is_default) VALUES (?1, ?2)";
        self.conn
            .execute(sql, params![name, is_default])
            .map_err(query_error(sql))?;
        Ok(ContextId(self.conn.last_insert_rowid()))
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn execute(&self, sql: &str, values: Vec<SqlValue>) -> Result<usize, StorageError> {
        debug!(statement = %sql, params = values.len(), "execute");
        self.conn
            .execute(sql, params_from_iter(values))
            .map_err(query_error(sql))
    }

    fn query_rows(&self, sql: &str, values: Vec<SqlValue>) -> Result<Vec<Row>, StorageError> {
        debug!(statement = %sql, params = values.len(), "query");
        let mut stmt = self.conn.prepare(sql).map_err(query_error(sql))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt
            .query(params_from_iter(values))
            .map_err(query_error(sql))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(query_error(sql))? {
            let mut out = Row::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let cell = row.get_ref(i).map_err(query_error(sql))?;
                out.insert(name.clone(), from_sql(cell));
            }
            result.push(out);
        }
        Ok(result)
    }
}

/// Wraps a rusqlite failure with the statement that produced it.
fn query_error(sql: &str) -> impl FnOnce(rusqlite::Error) -> StorageError + '_ {
    move |source| StorageError::Query {
        statement: sql.to_string(),
        source,
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// `"a" = ?1, "b" = ?2` for the columns of `values`, numbering from `start`.
fn assignments(values: &Row, start: usize) -> String {
    values
        .keys()
        .enumerate()
        .map(|(i, col)| format!("{} = ?{}", quote_ident(col), start + i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Column list and placeholder list for an insert of `values`.
fn insert_lists(values: &Row) -> (String, String) {
    let columns = values
        .keys()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=values.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    (columns, placeholders)
}

fn edge_values(key: &EdgeKey, attributes: &Row) -> Row {
    let mut row = Row::with_capacity(attributes.len() + 2);
    row.insert("pk1".to_string(), Value::from(key.pk1));
    row.insert("pk2".to_string(), Value::from(key.pk2));
    for (k, v) in attributes {
        row.insert(k.clone(), v.clone());
    }
    row
}

impl MeshStore for SqliteStore {
    fn columns(&self, table: &str) -> Result<Option<Vec<String>>, StorageError> {
        let sql = "SELECT name FROM pragma_table_info(?1) ORDER BY cid";
        let mut stmt = self.conn.prepare_cached(sql).map_err(query_error(sql))?;
        let names = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))
            .map_err(query_error(sql))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error(sql))?;
        Ok(if names.is_empty() { None } else { Some(names) })
    }

    fn select(&self, selection: &Selection) -> Result<Vec<Row>, StorageError> {
        let mut sql = format!("SELECT * FROM {}", quote_ident(selection.node_type.as_str()));
        let mut values = Vec::with_capacity(selection.predicates.len());
        for (i, p) in selection.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("{} = ?{}", quote_ident(&p.column), i + 1));
            values.push(to_sql(&p.value));
        }
        if let Some(limit) = selection.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        self.query_rows(&sql, values)
    }

    fn insert_row(&self, node_type: &NodeType, values: &Row) -> Result<Pk, StorageError> {
        let table = quote_ident(node_type.as_str());
        let sql = if values.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let (columns, placeholders) = insert_lists(values);
            format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
        };
        self.execute(&sql, values.values().map(to_sql).collect())?;
        Ok(Pk(self.conn.last_insert_rowid()))
    }

    fn update_row(
        &self,
        node_type: &NodeType,
        pk: Pk,
        values: &Row,
    ) -> Result<usize, StorageError> {
        if values.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE \"pk\" = ?{}",
            quote_ident(node_type.as_str()),
            assignments(values, 1),
            values.len() + 1
        );
        let mut params: Vec<SqlValue> = values.values().map(to_sql).collect();
        params.push(SqlValue::Integer(pk.0));
        self.execute(&sql, params)
    }

    fn find_edge(&self, key: &EdgeKey) -> Result<Option<Row>, StorageError> {
        let sql = format!(
            "SELECT * FROM {} WHERE \"pk1\" = ?1 AND \"pk2\" = ?2 LIMIT 1",
            quote_ident(&key.table.name())
        );
        let rows = self.query_rows(
            &sql,
            vec![SqlValue::Integer(key.pk1.0), SqlValue::Integer(key.pk2.0)],
        )?;
        Ok(rows.into_iter().next())
    }

    fn insert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError> {
        let values = edge_values(key, attributes);
        let (columns, placeholders) = insert_lists(&values);
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_ident(&key.table.name())
        );
        self.execute(&sql, values.values().map(to_sql).collect())?;
        Ok(())
    }

    fn update_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<usize, StorageError> {
        if attributes.is_empty() {
            return Ok(0);
        }
        let n = attributes.len();
        let sql = format!(
            "UPDATE {} SET {} WHERE \"pk1\" = ?{} AND \"pk2\" = ?{}",
            quote_ident(&key.table.name()),
            assignments(attributes, 1),
            n + 1,
            n + 2
        );
        let mut params: Vec<SqlValue> = attributes.values().map(to_sql).collect();
        params.push(SqlValue::Integer(key.pk1.0));
        params.push(SqlValue::Integer(key.pk2.0));
        self.execute(&sql, params)
    }

    fn upsert_edge(&self, key: &EdgeKey, attributes: &Row) -> Result<(), StorageError> {
        let values = edge_values(key, attributes);
        let (columns, placeholders) = insert_lists(&values);
        let action = if attributes.is_empty() {
            "NOTHING".to_string()
        } else {
            let sets = attributes
                .keys()
                .map(|c| format!("{0} = excluded.{0}", quote_ident(c)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("UPDATE SET {sets}")
        };
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders}) \
             ON CONFLICT (\"pk1\", \"pk2\") DO {action}",
            quote_ident(&key.table.name())
        );
        self.execute(&sql, values.values().map(to_sql).collect())?;
        Ok(())
    }

    fn delete_edge(&self, key: &EdgeKey) -> Result<usize, StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE \"pk1\" = ?1 AND \"pk2\" = ?2",
            quote_ident(&key.table.name())
        );
        self.execute(
            &sql,
            vec![SqlValue::Integer(key.pk1.0), SqlValue::Integer(key.pk2.0)],
        )
    }
}

impl ContextResolver for SqliteStore {
    fn resolve(&self, name: &str) -> Result<Vec<ContextId>, StorageError> {
        let sql = "SELECT pk FROM context WHERE name = ?1 ORDER BY pk";
        let mut stmt = self.conn.prepare_cached(sql).map_err(query_error(sql))?;
        let ids = stmt
            .query_map(params![name], |row| row.get::<_, i64>(0))
            .map_err(query_error(sql))?
            .map(|r| r.map(ContextId))
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error(sql))?;
        if ids.is_empty() {
            return Err(StorageError::ContextNotFound {
                name: name.to_string(),
            });
        }
        Ok(ids)
    }

    fn default_context(&self) -> Result<Vec<ContextId>, StorageError> {
        let sql = "SELECT pk FROM context WHERE is_default = 1 ORDER BY pk";
        let mut stmt = self.conn.prepare_cached(sql).map_err(query_error(sql))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(query_error(sql))?
            .map(|r| r.map(ContextId))
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error(sql))?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodemesh_core::{ChainContext, EdgeTable, Endpoint};

    fn t(name: &str) -> NodeType {
        NodeType::new(name).unwrap()
    }

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                r#"
                CREATE TABLE person (pk INTEGER PRIMARY KEY, name TEXT, age INTEGER, context INTEGER);
                CREATE TABLE company (pk INTEGER PRIMARY KEY, name TEXT);
                CREATE TABLE "company#person" (
                    pk1 INTEGER NOT NULL, pk2 INTEGER NOT NULL, role TEXT, direction TEXT,
                    UNIQUE (pk1, pk2)
                );
                "#,
            )
            .unwrap();
        store
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn key(person: i64, company: i64) -> EdgeKey {
        let (p, c) = (t("person"), t("company"));
        EdgeKey::between(Endpoint::new(&p, Pk(person)), Endpoint::new(&c, Pk(company))).0
    }

    #[test]
    fn columns_reports_schema_and_missing_tables() {
        let store = store();
        assert_eq!(
            store.columns("person").unwrap().unwrap(),
            vec!["pk", "name", "age", "context"]
        );
        assert_eq!(
            store.columns("company#person").unwrap().unwrap(),
            vec!["pk1", "pk2", "role", "direction"]
        );
        assert_eq!(store.columns("ghost").unwrap(), None);
    }

    #[test]
    fn insert_select_update_node_rows() {
        let store = store();
        let person = t("person");
        let pk = store
            .insert_row(&person, &row(&[("name", "Ana".into()), ("age", 31.into())]))
            .unwrap();
        let rows = store
            .select(&ChainContext::node(person.clone(), pk).resolve().unwrap())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::from("Ana"));
        assert_eq!(rows[0]["pk"], Value::from(pk));

        let n = store
            .update_row(&person, pk, &row(&[("age", 32.into())]))
            .unwrap();
        assert_eq!(n, 1);
        let rows = store
            .select(&ChainContext::set(person).resolve().unwrap())
            .unwrap();
        assert_eq!(rows[0]["age"], Value::Integer(32));
    }

    #[test]
    fn empty_insert_uses_default_values() {
        let store = store();
        let pk1 = store.insert_row(&t("company"), &Row::new()).unwrap();
        let pk2 = store.insert_row(&t("company"), &Row::new()).unwrap();
        assert_ne!(pk1, pk2);
    }

    #[test]
    fn edge_lifecycle() {
        let store = store();
        let k = key(1, 2);
        assert_eq!(k.table, EdgeTable::for_types(&t("person"), &t("company")));
        assert!(store.find_edge(&k).unwrap().is_none());

        store.insert_edge(&k, &row(&[("role", "cto".into())])).unwrap();
        let found = store.find_edge(&k).unwrap().unwrap();
        assert_eq!(found["pk1"], Value::Integer(2));
        assert_eq!(found["pk2"], Value::Integer(1));

        assert_eq!(store.update_edge(&k, &row(&[("role", "ceo".into())])).unwrap(), 1);
        assert_eq!(store.find_edge(&k).unwrap().unwrap()["role"], Value::from("ceo"));

        assert_eq!(store.delete_edge(&k).unwrap(), 1);
        assert_eq!(store.delete_edge(&k).unwrap(), 0);
    }

    #[test]
    fn upsert_edge_inserts_then_updates() {
        let store = store();
        let k = key(3, 4);
        store.upsert_edge(&k, &row(&[("role", "a".into())])).unwrap();
        store.upsert_edge(&k, &row(&[("role", "b".into())])).unwrap();
        store.upsert_edge(&k, &Row::new()).unwrap();
        let count: i64 = store
            .connection()
            .query_row(r#"SELECT COUNT(*) FROM "company#person""#, [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.find_edge(&k).unwrap().unwrap()["role"], Value::from("b"));
    }

    #[test]
    fn failed_statement_carries_sql() {
        let store = store();
        let err = store
            .insert_row(&t("ghost"), &row(&[("x", 1.into())]))
            .unwrap_err();
        match err {
            StorageError::Query { statement, .. } => {
                assert!(statement.starts_with("INSERT INTO \"ghost\""), "{statement}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn contexts_resolve_from_table() {
        let store = store();
        let web = store.add_context("web", true).unwrap();
        let a = store.add_context("shared", false).unwrap();
        let b = store.add_context("shared", false).unwrap();
        assert_eq!(store.resolve("web").unwrap(), vec![web]);
        assert_eq!(store.resolve("shared").unwrap(), vec![a, b]);
        assert_eq!(store.default_context().unwrap(), vec![web]);
        assert!(matches!(
            store.resolve("missing"),
            Err(StorageError::ContextNotFound { .. })
        ));
    }
}
