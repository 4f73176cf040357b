//! Edge table naming and canonical ordering.
//!
//! An edge between two nodes lives in a join table named after the two node
//! types, lesser type first: `"{lesser}#{greater}"`. Inside that table the
//! endpoint that sorts first goes to `pk1`. Types sort lexicographically; when
//! both endpoints share a type they sort by `pk`.
//!
//! [`EdgeKey::between`] is the single place this rule lives. Link, unlink and
//! existence checks all go through it, so every path agrees on which table and
//! row an edge occupies.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::{NodeType, Pk};

/// Separator between the two type names of an edge table.
pub const EDGE_TABLE_SEPARATOR: char = '#';

/// Name of the join table for a pair of node types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeTable {
    lesser: NodeType,
    greater: NodeType,
}

impl EdgeTable {
    /// The table for `a` and `b`, in either argument order.
    pub fn for_types(a: &NodeType, b: &NodeType) -> Self {
        let (lesser, greater) = if a <= b { (a, b) } else { (b, a) };
        EdgeTable {
            lesser: lesser.clone(),
            greater: greater.clone(),
        }
    }

    pub fn lesser(&self) -> &NodeType {
        &self.lesser
    }

    pub fn greater(&self) -> &NodeType {
        &self.greater
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EdgeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lesser, EDGE_TABLE_SEPARATOR, self.greater)
    }
}

/// One end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub node_type: &'a NodeType,
    pub pk: Pk,
}

impl<'a> Endpoint<'a> {
    pub fn new(node_type: &'a NodeType, pk: Pk) -> Self {
        Endpoint { node_type, pk }
    }
}

/// Canonical location of an edge row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub table: EdgeTable,
    pub pk1: Pk,
    pub pk2: Pk,
}

/// Where the calling endpoint landed after canonical ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// The caller occupies `pk1`.
    CallerFirst,
    /// The caller occupies `pk2`.
    CallerSecond,
}

impl EdgeKey {
    /// Computes the canonical key of the edge from `caller` to `other`, and
    /// which slot the caller landed in.
    ///
    /// Only a strictly lesser caller lands first; a self-link (same type,
    /// same pk) places the caller second.
    pub fn between(caller: Endpoint<'_>, other: Endpoint<'_>) -> (EdgeKey, Orientation) {
        let order = caller
            .node_type
            .cmp(other.node_type)
            .then(caller.pk.cmp(&other.pk));
        let table = EdgeTable::for_types(caller.node_type, other.node_type);
        match order {
            Ordering::Less => (
                EdgeKey {
                    table,
                    pk1: caller.pk,
                    pk2: other.pk,
                },
                Orientation::CallerFirst,
            ),
            Ordering::Equal | Ordering::Greater => (
                EdgeKey {
                    table,
                    pk1: other.pk,
                    pk2: caller.pk,
                },
                Orientation::CallerSecond,
            ),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.table, self.pk1, self.pk2)
    }
}

/// Direction as supplied by a caller, relative to the calling node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Direction as stored, relative to canonical `pk1 -> pk2` orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredDirection {
    #[serde(rename = "LTR")]
    Ltr,
    #[serde(rename = "RTL")]
    Rtl,
}

impl Direction {
    /// Parses the caller-facing spelling; anything but `forward`/`reverse` is
    /// rejected.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "forward" => Ok(Direction::Forward),
            "reverse" => Ok(Direction::Reverse),
            other => Err(CoreError::InvalidDirection {
                value: other.to_string(),
            }),
        }
    }

    /// Rewrites this direction into the absolute stored form.
    pub fn normalize(self, orientation: Orientation) -> StoredDirection {
        match (self, orientation) {
            (Direction::Forward, Orientation::CallerFirst)
            | (Direction::Reverse, Orientation::CallerSecond) => StoredDirection::Ltr,
            (Direction::Forward, Orientation::CallerSecond)
            | (Direction::Reverse, Orientation::CallerFirst) => StoredDirection::Rtl,
        }
    }
}

impl StoredDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            StoredDirection::Ltr => "LTR",
            StoredDirection::Rtl => "RTL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(name: &str) -> NodeType {
        NodeType::new(name).unwrap()
    }

    #[test]
    fn different_types_order_by_name() {
        let person = t("person");
        let company = t("company");
        let (key, orient) = EdgeKey::between(
            Endpoint::new(&person, Pk(1)),
            Endpoint::new(&company, Pk(9)),
        );
        assert_eq!(key.table.name(), "company#person");
        assert_eq!((key.pk1, key.pk2), (Pk(9), Pk(1)));
        assert_eq!(orient, Orientation::CallerSecond);
    }

    #[test]
    fn same_type_orders_by_pk() {
        let person = t("person");
        let (key, orient) = EdgeKey::between(
            Endpoint::new(&person, Pk(10)),
            Endpoint::new(&person, Pk(2)),
        );
        assert_eq!(key.table.name(), "person#person");
        assert_eq!((key.pk1, key.pk2), (Pk(2), Pk(10)));
        assert_eq!(orient, Orientation::CallerSecond);
    }

    #[test]
    fn pk_order_is_numeric_not_textual() {
        let n = t("n");
        let (key, _) = EdgeKey::between(Endpoint::new(&n, Pk(10)), Endpoint::new(&n, Pk(9)));
        assert_eq!((key.pk1, key.pk2), (Pk(9), Pk(10)));
    }

    #[test]
    fn self_link_puts_caller_second() {
        let n = t("n");
        let (key, orient) = EdgeKey::between(Endpoint::new(&n, Pk(5)), Endpoint::new(&n, Pk(5)));
        assert_eq!((key.pk1, key.pk2), (Pk(5), Pk(5)));
        assert_eq!(orient, Orientation::CallerSecond);
        assert_eq!(Direction::Forward.normalize(orient), StoredDirection::Rtl);
    }

    #[test]
    fn direction_normalization() {
        use Orientation::{CallerFirst, CallerSecond};
        let cases = [
            (Direction::Forward, CallerFirst, StoredDirection::Ltr),
            (Direction::Forward, CallerSecond, StoredDirection::Rtl),
            (Direction::Reverse, CallerFirst, StoredDirection::Rtl),
            (Direction::Reverse, CallerSecond, StoredDirection::Ltr),
        ];
        for (direction, orientation, stored) in cases {
            assert_eq!(direction.normalize(orientation), stored);
        }
    }

    #[test]
    fn direction_parse_rejects_unknown() {
        assert_eq!(Direction::parse("forward"), Ok(Direction::Forward));
        assert_eq!(Direction::parse("reverse"), Ok(Direction::Reverse));
        for bad in ["LTR", "backward", "", "Forward"] {
            assert_eq!(
                Direction::parse(bad),
                Err(CoreError::InvalidDirection { value: bad.into() })
            );
        }
    }

    fn type_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("person".to_string()),
            Just("company".to_string()),
            Just("tag".to_string()),
            "[a-z][a-z0-9_]{0,6}",
        ]
    }

    proptest! {
        #[test]
        fn canonical_key_is_symmetric(
            ta in type_name(), pa in any::<i64>(),
            tb in type_name(), pb in any::<i64>(),
        ) {
            let (ta, tb) = (t(&ta), t(&tb));
            let a = Endpoint::new(&ta, Pk(pa));
            let b = Endpoint::new(&tb, Pk(pb));
            let (ab, o_ab) = EdgeKey::between(a, b);
            let (ba, o_ba) = EdgeKey::between(b, a);
            prop_assert_eq!(&ab, &ba);
            prop_assert_eq!(EdgeTable::for_types(&ta, &tb), EdgeTable::for_types(&tb, &ta));
            if ta != tb || pa != pb {
                prop_assert_ne!(o_ab, o_ba);
            } else {
                prop_assert_eq!(o_ab, Orientation::CallerSecond);
                prop_assert_eq!(o_ba, Orientation::CallerSecond);
            }
        }

        #[test]
        fn stored_direction_agrees_from_both_ends(
            pa in any::<i64>(), pb in any::<i64>(),
        ) {
            prop_assume!(pa != pb);
            let n = t("node");
            let (a, b) = (Endpoint::new(&n, Pk(pa)), Endpoint::new(&n, Pk(pb)));
            let (_, o_a) = EdgeKey::between(a, b);
            let (_, o_b) = EdgeKey::between(b, a);
            // A forward link from one end is a reverse link from the other.
            prop_assert_eq!(
                Direction::Forward.normalize(o_a),
                Direction::Reverse.normalize(o_b)
            );
        }
    }
}
