//! Clusters and link targets.
//!
//! A [`Cluster`] is a view over existing nodes, possibly nested. Link and
//! unlink accept four shapes of target; [`LinkTarget`] is the closed set of
//! valid shapes. Callers hand in a [`TargetRef`], which also admits bare
//! primary keys so that they can be turned away at the boundary: a pk alone
//! does not say which edge table to use.

use std::slice;

use crate::error::MeshError;
use crate::node::Node;

/// A member of a cluster.
#[derive(Debug, Clone)]
pub enum Member {
    Node(Node),
    Cluster(Cluster),
}

/// An ordered collection of nodes and nested clusters.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    members: Vec<Member>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) {
        self.members.push(Member::Node(node));
    }

    pub fn push_cluster(&mut self, cluster: Cluster) {
        self.members.push(Member::Cluster(cluster));
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Every node, nested clusters flattened depth-first in order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            stack: vec![self.members.iter()],
        }
    }

    /// Number of nodes after flattening.
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().next().is_none()
    }
}

impl FromIterator<Node> for Cluster {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Cluster {
            members: iter.into_iter().map(Member::Node).collect(),
        }
    }
}

impl FromIterator<Cluster> for Cluster {
    fn from_iter<I: IntoIterator<Item = Cluster>>(iter: I) -> Self {
        Cluster {
            members: iter.into_iter().map(Member::Cluster).collect(),
        }
    }
}

/// Depth-first iterator over the nodes of a cluster.
pub struct Nodes<'a> {
    stack: Vec<slice::Iter<'a, Member>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Member::Node(node)) => return Some(node),
                Some(Member::Cluster(inner)) => self.stack.push(inner.members.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// A link target as handed in by a caller, before validation.
#[derive(Debug, Clone, Copy)]
pub enum TargetRef<'a> {
    Node(&'a Node),
    Cluster(&'a Cluster),
    Nodes(&'a [Node]),
    Clusters(&'a [Cluster]),
    Pk(i64),
    Pks(&'a [i64]),
}

/// A validated link target.
#[derive(Debug, Clone, Copy)]
pub enum LinkTarget<'a> {
    Node(&'a Node),
    Cluster(&'a Cluster),
    Nodes(&'a [Node]),
    Clusters(&'a [Cluster]),
}

impl<'a> TryFrom<TargetRef<'a>> for LinkTarget<'a> {
    type Error = MeshError;

    fn try_from(target: TargetRef<'a>) -> Result<Self, Self::Error> {
        match target {
            TargetRef::Node(n) => Ok(LinkTarget::Node(n)),
            TargetRef::Cluster(c) => Ok(LinkTarget::Cluster(c)),
            TargetRef::Nodes(ns) => Ok(LinkTarget::Nodes(ns)),
            TargetRef::Clusters(cs) => Ok(LinkTarget::Clusters(cs)),
            TargetRef::Pk(_) => Err(MeshError::PkLinkRejected),
            // Judged by the first element; an empty list links nothing.
            TargetRef::Pks([]) => Ok(LinkTarget::Nodes(&[])),
            TargetRef::Pks(_) => Err(MeshError::PkLinkRejected),
        }
    }
}

impl<'a> LinkTarget<'a> {
    /// The nodes this target covers, in order.
    pub fn nodes(&self) -> Vec<&'a Node> {
        match *self {
            LinkTarget::Node(n) => vec![n],
            LinkTarget::Cluster(c) => c.nodes().collect(),
            LinkTarget::Nodes(ns) => ns.iter().collect(),
            LinkTarget::Clusters(cs) => cs.iter().flat_map(|c| c.nodes()).collect(),
        }
    }
}

impl<'a> From<&'a Node> for TargetRef<'a> {
    fn from(node: &'a Node) -> Self {
        TargetRef::Node(node)
    }
}

impl<'a> From<&'a Cluster> for TargetRef<'a> {
    fn from(cluster: &'a Cluster) -> Self {
        TargetRef::Cluster(cluster)
    }
}

impl<'a> From<&'a [Node]> for TargetRef<'a> {
    fn from(nodes: &'a [Node]) -> Self {
        TargetRef::Nodes(nodes)
    }
}

impl<'a> From<&'a Vec<Node>> for TargetRef<'a> {
    fn from(nodes: &'a Vec<Node>) -> Self {
        TargetRef::Nodes(nodes)
    }
}

impl<'a> From<&'a [Cluster]> for TargetRef<'a> {
    fn from(clusters: &'a [Cluster]) -> Self {
        TargetRef::Clusters(clusters)
    }
}

impl<'a> From<&'a Vec<Cluster>> for TargetRef<'a> {
    fn from(clusters: &'a Vec<Cluster>) -> Self {
        TargetRef::Clusters(clusters)
    }
}

impl From<i64> for TargetRef<'_> {
    fn from(pk: i64) -> Self {
        TargetRef::Pk(pk)
    }
}

impl<'a> From<&'a [i64]> for TargetRef<'a> {
    fn from(pks: &'a [i64]) -> Self {
        TargetRef::Pks(pks)
    }
}

impl<'a, const N: usize> From<&'a [i64; N]> for TargetRef<'a> {
    fn from(pks: &'a [i64; N]) -> Self {
        TargetRef::Pks(pks)
    }
}

impl<'a> From<&'a Vec<i64>> for TargetRef<'a> {
    fn from(pks: &'a Vec<i64>) -> Self {
        TargetRef::Pks(pks)
    }
}

#[cfg(test)]
mod tests {
    use nodemesh_core::{NodeType, Pk};

    use super::*;

    fn node(pk: i64) -> Node {
        Node::with_pk(NodeType::new("tag").unwrap(), Pk(pk))
    }

    fn pks(nodes: &[&Node]) -> Vec<i64> {
        nodes.iter().filter_map(|n| n.pk()).map(|p| p.0).collect()
    }

    #[test]
    fn nested_clusters_flatten_in_order() {
        let mut inner = Cluster::new();
        inner.push(node(2));
        inner.push(node(3));
        let mut outer = Cluster::new();
        outer.push(node(1));
        outer.push_cluster(inner);
        outer.push_cluster(Cluster::new());
        outer.push(node(4));

        let flat: Vec<_> = outer.nodes().collect();
        assert_eq!(pks(&flat), vec![1, 2, 3, 4]);
        assert_eq!(outer.len(), 4);
        assert!(Cluster::new().is_empty());
    }

    #[test]
    fn target_shapes() {
        let a = node(1);
        let list = vec![node(2), node(3)];
        let clusters: Vec<Cluster> = vec![
            list.iter().cloned().collect(),
            std::iter::once(node(4)).collect(),
        ];

        let t = LinkTarget::try_from(TargetRef::from(&a)).unwrap();
        assert_eq!(pks(&t.nodes()), vec![1]);
        let t = LinkTarget::try_from(TargetRef::from(&list)).unwrap();
        assert_eq!(pks(&t.nodes()), vec![2, 3]);
        let t = LinkTarget::try_from(TargetRef::from(&clusters)).unwrap();
        assert_eq!(pks(&t.nodes()), vec![2, 3, 4]);
        let t = LinkTarget::try_from(TargetRef::from(&clusters[0])).unwrap();
        assert_eq!(pks(&t.nodes()), vec![2, 3]);
    }

    #[test]
    fn bare_pks_are_rejected() {
        assert!(matches!(
            LinkTarget::try_from(TargetRef::from(42i64)),
            Err(MeshError::PkLinkRejected)
        ));
        assert!(matches!(
            LinkTarget::try_from(TargetRef::from(&[42i64, 43])),
            Err(MeshError::PkLinkRejected)
        ));
        let empty: Vec<i64> = Vec::new();
        let t = LinkTarget::try_from(TargetRef::from(&empty)).unwrap();
        assert!(t.nodes().is_empty());
    }
}
