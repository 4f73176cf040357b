//! Edge persistence: link, unlink, existence.
//!
//! Every path computes the edge location with [`EdgeKey::between`], so link,
//! unlink and existence checks always agree on table and row. A `direction`
//! attribute is rewritten from the caller's point of view (`forward`,
//! `reverse`) into the stored canonical form (`LTR`, `RTL`).
//!
//! The write itself follows [`LinkWriteMode`]. `CheckThenWrite` looks up the
//! row and then inserts or updates, which races when two callers link the
//! same edge at once. `Serialized` holds a per-edge lock across both steps.
//! `Upsert` hands the decision to the store.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::{debug, info};

use nodemesh_core::{Direction, EdgeKey, Endpoint, Orientation, Row, Value};
use nodemesh_storage::MeshStore;

use crate::classifier::SchemaRegistry;
use crate::config::LinkWriteMode;
use crate::error::MeshError;

/// Name of the link attribute rewritten relative to canonical orientation.
pub const DIRECTION_ATTRIBUTE: &str = "direction";

/// Key columns of every edge table; callers cannot set them as attributes.
const KEY_COLUMNS: [&str; 2] = ["pk1", "pk2"];

/// Writes and deletes edge rows.
#[derive(Debug)]
pub struct LinkManager {
    mode: LinkWriteMode,
    locks: DashMap<EdgeKey, Arc<Mutex<()>>>,
}

impl LinkManager {
    pub fn new(mode: LinkWriteMode) -> Self {
        LinkManager {
            mode,
            locks: DashMap::new(),
        }
    }

    pub fn mode(&self) -> LinkWriteMode {
        self.mode
    }

    /// True when the edge row at `key` exists.
    pub fn link_exists<S: MeshStore>(&self, store: &S, key: &EdgeKey) -> Result<bool, MeshError> {
        store
            .find_edge(key)
            .map(|row| row.is_some())
            .map_err(|source| MeshError::LinkLookup {
                key: key.clone(),
                source,
            })
    }

    /// Creates or updates the edge between `caller` and `other`.
    ///
    /// Returns the canonical key the edge was written at.
    pub fn link<S: MeshStore>(
        &self,
        store: &S,
        schemas: &SchemaRegistry,
        caller: Endpoint<'_>,
        other: Endpoint<'_>,
        attributes: &Row,
    ) -> Result<EdgeKey, MeshError> {
        let (key, orientation) = EdgeKey::between(caller, other);
        let attributes = normalize_attributes(attributes, orientation)?;
        validate_attributes(store, schemas, &key, &attributes)?;

        match self.mode {
            LinkWriteMode::CheckThenWrite => self.check_then_write(store, &key, &attributes)?,
            LinkWriteMode::Serialized => {
                let lock = self.lock_for(&key);
                let result = {
                    let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
                    self.check_then_write(store, &key, &attributes)
                };
                drop(lock);
                self.release(&key);
                result?;
            }
            LinkWriteMode::Upsert => {
                store
                    .upsert_edge(&key, &attributes)
                    .map_err(|source| MeshError::LinkWrite {
                        key: key.clone(),
                        source,
                    })?;
                info!(edge = %key, "upserted link");
            }
        }
        Ok(key)
    }

    /// Deletes the edge between `caller` and `other`. A missing row is not an
    /// error; returns whether a row was removed.
    pub fn unlink<S: MeshStore>(
        &self,
        store: &S,
        caller: Endpoint<'_>,
        other: Endpoint<'_>,
    ) -> Result<bool, MeshError> {
        let (key, _) = EdgeKey::between(caller, other);
        let removed = store.delete_edge(&key).map_err(|source| MeshError::LinkWrite {
            key: key.clone(),
            source,
        })?;
        debug!(edge = %key, removed, "unlinked");
        Ok(removed > 0)
    }

    fn check_then_write<S: MeshStore>(
        &self,
        store: &S,
        key: &EdgeKey,
        attributes: &Row,
    ) -> Result<(), MeshError> {
        let write_err = |source| MeshError::LinkWrite {
            key: key.clone(),
            source,
        };
        if self.link_exists(store, key)? {
            store.update_edge(key, attributes).map_err(write_err)?;
            info!(edge = %key, "updated link");
        } else {
            store.insert_edge(key, attributes).map_err(write_err)?;
            info!(edge = %key, "inserted link");
        }
        Ok(())
    }

    fn lock_for(&self, key: &EdgeKey) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drops the lock entry once no other caller holds it.
    fn release(&self, key: &EdgeKey) {
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of edges currently holding a lock entry.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

/// Copies `attributes`, rewriting `direction` into its stored form.
fn normalize_attributes(attributes: &Row, orientation: Orientation) -> Result<Row, MeshError> {
    let mut out = attributes.clone();
    if let Some(value) = out.get_mut(DIRECTION_ATTRIBUTE) {
        let given = match value {
            Value::Text(s) => s.as_str(),
            _ => "",
        };
        let direction = Direction::parse(given).map_err(|_| MeshError::InvalidLinkDirection {
            value: display_value(value),
        })?;
        *value = Value::from(direction.normalize(orientation).as_str());
    }
    Ok(out)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// Checks link attribute names against the edge table's columns. Skipped
/// when the table is unknown; the write then fails in the store.
fn validate_attributes<S: MeshStore>(
    store: &S,
    schemas: &SchemaRegistry,
    key: &EdgeKey,
    attributes: &Row,
) -> Result<(), MeshError> {
    let table = key.table.name();
    let schema = schemas
        .schema(store, &table)
        .map_err(|source| MeshError::LinkLookup {
            key: key.clone(),
            source,
        })?;
    for name in attributes.keys() {
        let known = schema.as_ref().map_or(true, |s| s.has_column(name));
        if KEY_COLUMNS.contains(&name.as_str()) || !known {
            return Err(MeshError::UnknownLinkAttribute {
                table,
                attribute: name.clone(),
            });
        }
    }
    Ok(())
}
