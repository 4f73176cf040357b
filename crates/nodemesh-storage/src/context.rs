//! Configuration-fed [`ContextResolver`].

use std::collections::HashMap;

use nodemesh_core::ContextId;

use crate::error::StorageError;
use crate::traits::ContextResolver;

/// Resolves contexts from a fixed table built at startup.
///
/// Used with [`crate::InMemoryStore`] and for deployments that keep contexts
/// in configuration rather than in the database. An empty resolver is a
/// context-less setup: nothing resolves and the default set is empty.
#[derive(Debug, Clone, Default)]
pub struct StaticContexts {
    named: HashMap<String, Vec<ContextId>>,
    defaults: Vec<ContextId>,
}

impl StaticContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` under `name`. Registering several ids under one name
    /// makes that name ambiguous for commits.
    pub fn with_context(mut self, name: impl Into<String>, id: ContextId) -> Self {
        self.named.entry(name.into()).or_default().push(id);
        self
    }

    /// Sets the default context set for new nodes.
    pub fn with_defaults(mut self, defaults: Vec<ContextId>) -> Self {
        self.defaults = defaults;
        self
    }
}

impl ContextResolver for StaticContexts {
    fn resolve(&self, name: &str) -> Result<Vec<ContextId>, StorageError> {
        match self.named.get(name) {
            Some(ids) if !ids.is_empty() => Ok(ids.clone()),
            _ => Err(StorageError::ContextNotFound {
                name: name.to_string(),
            }),
        }
    }

    fn default_context(&self) -> Result<Vec<ContextId>, StorageError> {
        Ok(self.defaults.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_names() {
        let contexts = StaticContexts::new()
            .with_context("web", ContextId(1))
            .with_context("shared", ContextId(2))
            .with_context("shared", ContextId(3));
        assert_eq!(contexts.resolve("web").unwrap(), vec![ContextId(1)]);
        assert_eq!(
            contexts.resolve("shared").unwrap(),
            vec![ContextId(2), ContextId(3)]
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        let contexts = StaticContexts::new();
        assert!(matches!(
            contexts.resolve("nope"),
            Err(StorageError::ContextNotFound { .. })
        ));
        assert!(contexts.default_context().unwrap().is_empty());
    }
}
