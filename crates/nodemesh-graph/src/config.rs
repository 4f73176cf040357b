//! Engine configuration.
//!
//! [`MeshConfig`] is read from environment variables or JSON:
//! - `NODEMESH_DB_PATH`: SQLite database file path (default: "nodemesh.db")
//! - `NODEMESH_LINK_WRITE`: `check_then_write`, `serialized` or `upsert`
//!   (default: `serialized`)
//! - `NODEMESH_CONTEXT_COLUMN`: column holding a node's context (default: "context")
//! - `NODEMESH_DEFAULT_CONTEXTS`: comma-separated context ids for new nodes

use std::fmt;
use std::str::FromStr;

use nodemesh_core::id::is_identifier;
use nodemesh_core::ContextId;
use nodemesh_storage::StaticContexts;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How `link_node` turns "does this edge exist" into a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkWriteMode {
    /// Look up, then insert or update. Two concurrent links of the same edge
    /// can both see "missing" and both insert.
    CheckThenWrite,
    /// Look up and write while holding a per-edge lock. Closes the race
    /// between callers sharing one `Mesh`.
    #[default]
    Serialized,
    /// One store-level insert-or-update. Needs a unique key on `(pk1, pk2)`.
    Upsert,
}

impl FromStr for LinkWriteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_then_write" => Ok(LinkWriteMode::CheckThenWrite),
            "serialized" => Ok(LinkWriteMode::Serialized),
            "upsert" => Ok(LinkWriteMode::Upsert),
            other => Err(ConfigError::InvalidVar {
                var: "NODEMESH_LINK_WRITE",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for LinkWriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkWriteMode::CheckThenWrite => "check_then_write",
            LinkWriteMode::Serialized => "serialized",
            LinkWriteMode::Upsert => "upsert",
        })
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    InvalidVar { var: &'static str, value: String },

    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// SQLite database path.
    pub db_path: String,
    /// Edge write strategy.
    pub link_write: LinkWriteMode,
    /// Column a node's context id is written to.
    pub context_column: String,
    /// Default context ids for new nodes when contexts come from config.
    pub default_contexts: Vec<i64>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfig {
            db_path: "nodemesh.db".to_string(),
            link_write: LinkWriteMode::default(),
            context_column: "context".to_string(),
            default_contexts: Vec::new(),
        }
    }
}

impl MeshConfig {
    /// Reads the configuration from `NODEMESH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Parses a JSON document; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: MeshConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = MeshConfig::default();
        if let Some(path) = lookup("NODEMESH_DB_PATH") {
            config.db_path = path;
        }
        if let Some(mode) = lookup("NODEMESH_LINK_WRITE") {
            config.link_write = mode.trim().parse()?;
        }
        if let Some(column) = lookup("NODEMESH_CONTEXT_COLUMN") {
            config.context_column = column.trim().to_string();
        }
        if let Some(ids) = lookup("NODEMESH_DEFAULT_CONTEXTS") {
            config.default_contexts = ids
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<i64>().map_err(|_| ConfigError::InvalidVar {
                        var: "NODEMESH_DEFAULT_CONTEXTS",
                        value: ids.clone(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.context_column) {
            return Err(ConfigError::InvalidVar {
                var: "NODEMESH_CONTEXT_COLUMN",
                value: self.context_column.clone(),
            });
        }
        Ok(())
    }

    /// A resolver whose default set is `default_contexts`.
    pub fn static_contexts(&self) -> StaticContexts {
        StaticContexts::new().with_defaults(
            self.default_contexts.iter().copied().map(ContextId).collect(),
        )
    }
}
