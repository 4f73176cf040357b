//! The node façade: fetch, materialize, link, unlink, commit.
//!
//! A [`Node`] is a handle: its type, its primary key once persisted, the chain
//! context that reached it, and a private [`StateCache`]. Operations take the
//! [`Mesh`] that owns the store, the schema registry and the link manager.
//!
//! Fields handed to [`Node::commit`] are split by schema: columns of the
//! node's own table are written to its row, names of other node types become
//! edges to the given nodes.

use indexmap::IndexMap;
use tracing::{debug, info};

use nodemesh_core::{
    ChainContext, ChainStep, ContextId, EdgeKey, Endpoint, NodeType, Pk, Predicate, Row,
    Selection, Value,
};
use nodemesh_storage::{ContextResolver, MeshStore};

use crate::cache::StateCache;
use crate::cluster::{Cluster, LinkTarget, TargetRef};
use crate::error::MeshError;
use crate::mesh::Mesh;

/// A value handed to [`Node::commit`] for one field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// A column value.
    Value(Value),
    /// A single related node.
    Node(Node),
    /// Related nodes grouped in a cluster.
    Cluster(Cluster),
    /// A list of related nodes.
    Nodes(Vec<Node>),
    /// A list of clusters of related nodes.
    Clusters(Vec<Cluster>),
    /// Bare primary keys; always rejected for relations.
    Pks(Vec<i64>),
}

impl FieldValue {
    /// The link target this value denotes when used for a relation. Column
    /// values other than integers denote nothing.
    pub fn as_target(&self) -> Option<TargetRef<'_>> {
        match self {
            FieldValue::Value(Value::Integer(pk)) => Some(TargetRef::Pk(*pk)),
            FieldValue::Value(_) => None,
            FieldValue::Node(n) => Some(TargetRef::Node(n)),
            FieldValue::Cluster(c) => Some(TargetRef::Cluster(c)),
            FieldValue::Nodes(ns) => Some(TargetRef::Nodes(ns)),
            FieldValue::Clusters(cs) => Some(TargetRef::Clusters(cs)),
            FieldValue::Pks(pks) => Some(TargetRef::Pks(pks)),
        }
    }
}

macro_rules! field_value_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::Value(Value::from(v))
            }
        })*
    };
}

field_value_from_scalar!(i64, i32, f64, bool, &str, String, Vec<u8>, Pk, ContextId);

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Value(v)
    }
}

impl From<Node> for FieldValue {
    fn from(n: Node) -> Self {
        FieldValue::Node(n)
    }
}

impl From<Cluster> for FieldValue {
    fn from(c: Cluster) -> Self {
        FieldValue::Cluster(c)
    }
}

impl From<Vec<Node>> for FieldValue {
    fn from(ns: Vec<Node>) -> Self {
        FieldValue::Nodes(ns)
    }
}

impl From<Vec<Cluster>> for FieldValue {
    fn from(cs: Vec<Cluster>) -> Self {
        FieldValue::Clusters(cs)
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(pks: Vec<i64>) -> Self {
        FieldValue::Pks(pks)
    }
}

/// The context a commit asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContextSpec {
    /// No context given: existing nodes keep theirs, new nodes take the
    /// resolver's defaults.
    #[default]
    Unspecified,
    /// A context name, resolved through the [`ContextResolver`].
    Named(String),
    /// Context ids given directly.
    Ids(Vec<ContextId>),
}

/// Values for one commit.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    context: ContextSpec,
    values: IndexMap<String, FieldValue>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets field `name`. Later values replace earlier ones.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Commits into the context called `name`.
    pub fn context(mut self, name: impl Into<String>) -> Self {
        self.context = ContextSpec::Named(name.into());
        self
    }

    /// Commits into the given context ids.
    pub fn context_ids(mut self, ids: Vec<ContextId>) -> Self {
        self.context = ContextSpec::Ids(ids);
        self
    }

    pub fn values(&self) -> &IndexMap<String, FieldValue> {
        &self.values
    }

    pub fn context_spec(&self) -> &ContextSpec {
        &self.context
    }

    /// Separates the context from the values. An entry named after the
    /// context column counts as the context when none was given explicitly.
    /// A null or empty context is no context at all.
    fn into_parts(
        self,
        node_type: &NodeType,
        context_field: &str,
    ) -> Result<(ContextSpec, IndexMap<String, FieldValue>), MeshError> {
        let Fields {
            mut context,
            mut values,
        } = self;
        if let Some(value) = values.shift_remove(context_field) {
            let invalid = |reason| MeshError::InvalidFieldValue {
                node_type: node_type.clone(),
                field: context_field.to_string(),
                reason,
            };
            if context != ContextSpec::Unspecified {
                return Err(invalid("context given twice"));
            }
            context = match value {
                FieldValue::Value(Value::Text(name)) => ContextSpec::Named(name),
                FieldValue::Value(Value::Integer(id)) => ContextSpec::Ids(vec![ContextId(id)]),
                FieldValue::Value(Value::Null) => ContextSpec::Unspecified,
                _ => return Err(invalid("a context is a name or an id")),
            };
        }
        if matches!(&context, ContextSpec::Ids(ids) if ids.is_empty()) {
            context = ContextSpec::Unspecified;
        }
        Ok((context, values))
    }
}

/// A typed graph node.
#[derive(Debug, Clone)]
pub struct Node {
    node_type: NodeType,
    pk: Option<Pk>,
    chain: ChainContext,
    cache: StateCache,
}

impl Node {
    /// A handle on every node of `node_type`.
    pub fn set(node_type: NodeType) -> Self {
        Node {
            chain: ChainContext::set(node_type.clone()),
            node_type,
            pk: None,
            cache: StateCache::new(),
        }
    }

    /// A specific node reached through `chain`. A chain that does not start
    /// with a type gets `node_type` put in front.
    pub fn new(node_type: NodeType, chain: ChainContext) -> Self {
        let chain = match chain.node_type() {
            Some(_) => chain,
            None => {
                let mut steps = vec![ChainStep::Type(node_type.clone())];
                steps.extend(chain.steps().iter().cloned());
                ChainContext::from_steps(steps)
            }
        };
        Node {
            pk: chain.pk(),
            node_type,
            chain,
            cache: StateCache::new(),
        }
    }

    /// The persisted node `pk` of `node_type`.
    pub fn with_pk(node_type: NodeType, pk: Pk) -> Self {
        Node {
            chain: ChainContext::node(node_type.clone(), pk),
            node_type,
            pk: Some(pk),
            cache: StateCache::new(),
        }
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn pk(&self) -> Option<Pk> {
        self.pk
    }

    pub fn chain(&self) -> &ChainContext {
        &self.chain
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// A cached attribute value. Does not go to the store.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cache.get(column)
    }

    /// Reads this node's row into the cache.
    ///
    /// Resolves the chain, runs the selection and merges the first row
    /// returned. No row is not an error: the cache stays as it was.
    pub fn fetch<S, C>(&mut self, mesh: &Mesh<S, C>) -> Result<(), MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        let selection = self.chain.resolve()?;
        let rows = mesh.store().select(&selection)?;
        let Some(first) = rows.first() else {
            debug!(node_type = %self.node_type, "fetch matched no rows");
            return Ok(());
        };
        self.cache.materialize(first);
        if self.pk.is_none() && !self.chain.is_virtual() {
            self.pk = first.get("pk").and_then(Value::as_i64).map(Pk);
        }
        Ok(())
    }

    /// The node's attributes, fetching them on first use.
    pub fn to_array<S, C>(&mut self, mesh: &Mesh<S, C>) -> Result<&Row, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        if self.cache.is_empty() {
            self.fetch(mesh)?;
        } else {
            debug!(node_type = %self.node_type, "state cache hit");
        }
        Ok(self.cache.data())
    }

    /// The selection that identifies this node. A single node takes no
    /// filters.
    pub fn me(&self, filters: &[Predicate]) -> Result<Selection, MeshError> {
        if !filters.is_empty() {
            return Err(MeshError::SingletonFilter {
                node_type: self.node_type.clone(),
            });
        }
        Ok(self.chain.resolve()?)
    }

    /// Links this node to every node of `target`, writing `attributes` on
    /// each edge. Returns the edges written, in target order.
    pub fn link<'t, S, C>(
        &mut self,
        mesh: &Mesh<S, C>,
        target: impl Into<TargetRef<'t>>,
        attributes: &Row,
    ) -> Result<Vec<EdgeKey>, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        let target = LinkTarget::try_from(target.into())?;
        let pk = self.ensure_pk(mesh)?;
        let caller = Endpoint::new(&self.node_type, pk);
        target
            .nodes()
            .into_iter()
            .map(|other| {
                let other = endpoint(other)?;
                mesh.links()
                    .link(mesh.store(), mesh.schemas(), caller, other, attributes)
            })
            .collect()
    }

    /// Removes the edges between this node and every node of `target`.
    /// Returns how many edges existed.
    pub fn unlink<'t, S, C>(
        &mut self,
        mesh: &Mesh<S, C>,
        target: impl Into<TargetRef<'t>>,
    ) -> Result<usize, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        let target = LinkTarget::try_from(target.into())?;
        let pk = self.ensure_pk(mesh)?;
        let caller = Endpoint::new(&self.node_type, pk);
        let mut removed = 0;
        for other in target.nodes() {
            if mesh.links().unlink(mesh.store(), caller, endpoint(other)?)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Writes `fields` and links the related nodes they name.
    ///
    /// A new node is inserted and adopts the generated key; an existing one
    /// is updated. Returns a fresh handle on the committed row. Any failure
    /// comes back as [`MeshError::Commit`]; writes made before it stay.
    pub fn commit<S, C>(&mut self, mesh: &Mesh<S, C>, fields: Fields) -> Result<Node, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        self.try_commit(mesh, fields)
            .map_err(|source| MeshError::Commit {
                node_type: self.node_type.clone(),
                source: Box::new(source),
            })
    }

    fn try_commit<S, C>(&mut self, mesh: &Mesh<S, C>, fields: Fields) -> Result<Node, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        self.locate(mesh)?;
        let context_field = mesh.config().context_column.as_str();
        let (context, values) = fields.into_parts(&self.node_type, context_field)?;
        let context = self.resolve_context(mesh, context)?;
        let mut split = mesh
            .schemas()
            .split_fields(mesh.store(), &self.node_type, &values)?;
        if let Some(id) = context {
            split
                .attributes
                .insert(mesh.config().context_column.clone(), Value::from(id));
        }

        self.cache.populate(&split.attributes);
        let pk = match self.pk {
            Some(pk) => {
                if !split.attributes.is_empty() {
                    let updated = mesh
                        .store()
                        .update_row(&self.node_type, pk, &split.attributes)?;
                    debug!(node_type = %self.node_type, %pk, updated, "updated node");
                }
                pk
            }
            None => {
                let pk = mesh.store().insert_row(&self.node_type, &split.attributes)?;
                info!(node_type = %self.node_type, %pk, "inserted node");
                self.pk = Some(pk);
                self.cache.set("pk", Value::from(pk));
                self.chain.push(ChainStep::Pk(pk));
                pk
            }
        };

        let caller = Endpoint::new(&self.node_type, pk);
        for nodes in split.relations.values() {
            for other in nodes {
                mesh.links().link(
                    mesh.store(),
                    mesh.schemas(),
                    caller,
                    endpoint(other)?,
                    &Row::new(),
                )?;
            }
        }

        Ok(Node::new(self.node_type.clone(), self.chain.clone()))
    }

    /// Applies the context rules: at most one context id survives.
    fn resolve_context<S, C>(
        &self,
        mesh: &Mesh<S, C>,
        spec: ContextSpec,
    ) -> Result<Option<ContextId>, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        let ids = match spec {
            ContextSpec::Named(name) => mesh.contexts().resolve(&name)?,
            ContextSpec::Ids(ids) => ids,
            ContextSpec::Unspecified if self.pk.is_some() => Vec::new(),
            ContextSpec::Unspecified => mesh.contexts().default_context()?,
        };
        match ids.as_slice() {
            [] => Ok(None),
            [id] => {
                let column = &mesh.config().context_column;
                if !mesh
                    .schemas()
                    .is_attribute(mesh.store(), &self.node_type, column)?
                {
                    return Err(MeshError::ContextUnsupported {
                        node_type: self.node_type.clone(),
                        column: column.clone(),
                    });
                }
                Ok(Some(*id))
            }
            more => Err(MeshError::AmbiguousContext { count: more.len() }),
        }
    }

    /// Looks up the row a filtered chain points at and pins the chain to
    /// it. Set handles and nodes that already know their key are left alone.
    fn locate<S, C>(&mut self, mesh: &Mesh<S, C>) -> Result<Option<Pk>, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        if self.pk.is_none() && !self.chain.is_virtual() {
            self.fetch(mesh)?;
            if let Some(pk) = self.pk {
                self.chain.push(ChainStep::Pk(pk));
            }
        }
        Ok(self.pk)
    }

    /// This node's key, fetching it when the chain names a single row.
    fn ensure_pk<S, C>(&mut self, mesh: &Mesh<S, C>) -> Result<Pk, MeshError>
    where
        S: MeshStore,
        C: ContextResolver,
    {
        self.locate(mesh)?.ok_or_else(|| MeshError::UnpersistedNode {
            node_type: self.node_type.clone(),
        })
    }
}

fn endpoint(node: &Node) -> Result<Endpoint<'_>, MeshError> {
    let pk = node.pk.ok_or_else(|| MeshError::UnpersistedNode {
        node_type: node.node_type.clone(),
    })?;
    Ok(Endpoint::new(&node.node_type, pk))
}
