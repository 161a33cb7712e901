//! Unlinked-input resolution.
//!
//! Every input the artist left unconnected needs a constant source. A
//! [`UnlinkedInputsGrouper`] partitions the unlinked inputs into groups that
//! may share one source, and an [`UnlinkedInputsInserter`] creates exactly one
//! source per group. [`resolve_unlinked`] runs both, checks their output, and
//! returns one origin per unlinked input, in input order.

use crate::graph::{Graph, GraphError, SocketId};
use crate::invariant_ppt::{
    assert_invariant, ONE_ORIGIN_PER_GROUP, ORIGIN_ORDER_PRESERVED, UNLINKED_PARTITION,
};
use crate::node::NodeType;
use crate::socket::{Direction, SocketType, SocketValue};
use std::collections::HashMap;
use thiserror::Error;

/// An input socket with no incoming link.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlinkedInput {
    /// The input in the graph under construction.
    pub socket: SocketId,
    /// Socket type.
    pub ty: SocketType,
    /// Value the source must provide.
    pub default: SocketValue,
    /// Kind of the owning node.
    pub node_kind: String,
    /// Socket name.
    pub socket_name: String,
}

/// Errors from grouping or insertion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnlinkedError {
    /// The grouper produced an empty group.
    #[error("group {group} is empty")]
    EmptyGroup {
        /// Group index.
        group: usize,
    },
    /// The grouper referenced an input that does not exist.
    #[error("group refers to unlinked input {index}, but there are only {len}")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of unlinked inputs.
        len: usize,
    },
    /// The grouper put an input into more than one group.
    #[error("unlinked input {index} appears in more than one group")]
    Duplicate {
        /// Offending index.
        index: usize,
    },
    /// The grouper left an input out.
    #[error("unlinked input {index} is not in any group")]
    Unassigned {
        /// Offending index.
        index: usize,
    },
    /// A group mixes socket types, so no single source can feed it.
    #[error("group {group} mixes socket types")]
    MixedTypes {
        /// Group index.
        group: usize,
    },
    /// The inserter did not return one origin per group.
    #[error("inserter returned {returned} origins for {groups} groups")]
    OriginCount {
        /// Origins returned.
        returned: usize,
        /// Groups given.
        groups: usize,
    },
    /// An origin is not an output socket.
    #[error("origin for group {group} is not an output socket")]
    OriginNotOutput {
        /// Group index.
        group: usize,
    },
    /// An origin's type differs from its group's inputs.
    #[error("origin for group {group} is {found:?}, inputs expect {expected:?}")]
    OriginType {
        /// Group index.
        group: usize,
        /// Type of the group's inputs.
        expected: SocketType,
        /// Type of the origin.
        found: SocketType,
    },
    /// The graph rejected an edit.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Partitions unlinked inputs into groups that may share one source.
pub trait UnlinkedInputsGrouper {
    /// Return groups as indices into `inputs`. Every index must appear in
    /// exactly one group and no group may be empty.
    fn group(&self, inputs: &[UnlinkedInput]) -> Vec<Vec<usize>>;
}

/// Materializes constant sources for groups of unlinked inputs.
pub trait UnlinkedInputsInserter {
    /// Add sources to `graph` and return exactly one output socket per group,
    /// in group order.
    fn insert(
        &self,
        graph: &mut Graph,
        inputs: &[UnlinkedInput],
        groups: &[Vec<usize>],
    ) -> Result<Vec<SocketId>, UnlinkedError>;
}

/// Groups inputs with the same type and bit-identical default value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueGrouper;

impl UnlinkedInputsGrouper for ValueGrouper {
    fn group(&self, inputs: &[UnlinkedInput]) -> Vec<Vec<usize>> {
        group_by_key(inputs, |input| input.default.key())
    }
}

/// One group per input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketGrouper;

impl UnlinkedInputsGrouper for SocketGrouper {
    fn group(&self, inputs: &[UnlinkedInput]) -> Vec<Vec<usize>> {
        (0..inputs.len()).map(|i| vec![i]).collect()
    }
}

/// Groups inputs with the same node kind, socket name and default value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeKindGrouper;

impl UnlinkedInputsGrouper for NodeKindGrouper {
    fn group(&self, inputs: &[UnlinkedInput]) -> Vec<Vec<usize>> {
        group_by_key(inputs, |input| {
            (
                input.node_kind.clone(),
                input.socket_name.clone(),
                input.default.key(),
            )
        })
    }
}

/// Groups ordered by first member, members in input order.
fn group_by_key<K, F>(inputs: &[UnlinkedInput], key: F) -> Vec<Vec<usize>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&UnlinkedInput) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, input) in inputs.iter().enumerate() {
        let slot = *slots.entry(key(input)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }
    groups
}

/// Inserts one [`NodeType::Constant`] node per group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantNodeInserter;

impl UnlinkedInputsInserter for ConstantNodeInserter {
    fn insert(
        &self,
        graph: &mut Graph,
        inputs: &[UnlinkedInput],
        groups: &[Vec<usize>],
    ) -> Result<Vec<SocketId>, UnlinkedError> {
        let mut origins = Vec::with_capacity(groups.len());
        for (index, group) in groups.iter().enumerate() {
            let first = group_source(inputs, group, index)?;
            let name = format!("{} default", first.socket_name);
            let node = graph.add_node(&name, NodeType::Constant { value: first.default }, None);
            let origin = graph.output(node, 0).ok_or(GraphError::InvalidNode(node))?;
            origins.push(origin);
        }
        Ok(origins)
    }
}

/// Inserts a single [`NodeType::DefaultLoader`] node with one output per group.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderNodeInserter;

impl UnlinkedInputsInserter for LoaderNodeInserter {
    fn insert(
        &self,
        graph: &mut Graph,
        inputs: &[UnlinkedInput],
        groups: &[Vec<usize>],
    ) -> Result<Vec<SocketId>, UnlinkedError> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let values = groups
            .iter()
            .enumerate()
            .map(|(index, group)| group_source(inputs, group, index).map(|first| first.default))
            .collect::<Result<Vec<_>, _>>()?;
        let node = graph.add_node("Default Loader", NodeType::DefaultLoader { values }, None);
        Ok(graph.node(node)?.outputs.clone())
    }
}

/// First member of a group, after checking the group is non-empty and of one type.
fn group_source<'a>(
    inputs: &'a [UnlinkedInput],
    group: &[usize],
    index: usize,
) -> Result<&'a UnlinkedInput, UnlinkedError> {
    let first = group
        .first()
        .and_then(|&i| inputs.get(i))
        .ok_or(UnlinkedError::EmptyGroup { group: index })?;
    if group
        .iter()
        .any(|&i| inputs.get(i).map_or(true, |input| input.ty != first.ty))
    {
        return Err(UnlinkedError::MixedTypes { group: index });
    }
    Ok(first)
}

/// Check that `groups` partitions `0..len`.
pub fn check_partition(groups: &[Vec<usize>], len: usize) -> Result<(), UnlinkedError> {
    let mut seen = vec![false; len];
    for (group_index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(UnlinkedError::EmptyGroup { group: group_index });
        }
        for &index in group {
            match seen.get_mut(index) {
                None => return Err(UnlinkedError::IndexOutOfRange { index, len }),
                Some(true) => return Err(UnlinkedError::Duplicate { index }),
                Some(slot) => *slot = true,
            }
        }
    }
    match seen.iter().position(|s| !s) {
        Some(index) => Err(UnlinkedError::Unassigned { index }),
        None => Ok(()),
    }
}

/// Group `inputs`, insert one source per group, and return the origin for
/// each input in input order. Members of a group share an origin.
///
/// The returned origins are not wired yet.
pub fn resolve_unlinked(
    graph: &mut Graph,
    inputs: &[UnlinkedInput],
    grouper: &dyn UnlinkedInputsGrouper,
    inserter: &dyn UnlinkedInputsInserter,
) -> Result<Vec<SocketId>, UnlinkedError> {
    let groups = grouper.group(inputs);
    check_partition(&groups, inputs.len())?;
    assert_invariant(
        UNLINKED_PARTITION,
        true,
        "Unlinked inputs partitioned",
        Some("resolve_unlinked"),
    );
    tracing::debug!(
        unlinked = inputs.len(),
        groups = groups.len(),
        "unlinked inputs grouped"
    );

    let group_origins = inserter.insert(graph, inputs, &groups)?;
    if group_origins.len() != groups.len() {
        return Err(UnlinkedError::OriginCount {
            returned: group_origins.len(),
            groups: groups.len(),
        });
    }

    let mut origins: Vec<Option<SocketId>> = vec![None; inputs.len()];
    for (group_index, (group, &origin)) in groups.iter().zip(&group_origins).enumerate() {
        let socket = graph.socket(origin)?;
        if socket.direction != Direction::Output {
            return Err(UnlinkedError::OriginNotOutput { group: group_index });
        }
        for &member in group {
            let expected = inputs[member].ty;
            if socket.ty != expected {
                return Err(UnlinkedError::OriginType {
                    group: group_index,
                    expected,
                    found: socket.ty,
                });
            }
            origins[member] = Some(origin);
        }
    }
    assert_invariant(
        ONE_ORIGIN_PER_GROUP,
        true,
        "One origin inserted per group",
        Some("resolve_unlinked"),
    );

    let origins = origins
        .into_iter()
        .enumerate()
        .map(|(index, origin)| origin.ok_or(UnlinkedError::Unassigned { index }))
        .collect::<Result<Vec<_>, _>>()?;
    assert_invariant(
        ORIGIN_ORDER_PRESERVED,
        origins.len() == inputs.len(),
        "Origins returned in unlinked-input order",
        Some("resolve_unlinked"),
    );
    Ok(origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::RotateMode;

    fn unlinked(value: SocketValue, kind: &str, name: &str) -> UnlinkedInput {
        UnlinkedInput {
            socket: SocketId(0),
            ty: value.value_type(),
            default: value,
            node_kind: kind.to_string(),
            socket_name: name.to_string(),
        }
    }

    /// A graph with two rotate nodes and every input unlinked.
    fn two_rotates() -> (Graph, Vec<UnlinkedInput>) {
        let mut graph = Graph::new();
        for name in ["a", "b"] {
            graph.add_node(
                name,
                NodeType::VectorRotate {
                    mode: RotateMode::AxisAngle,
                },
                None,
            );
        }
        let inputs = graph
            .unlinked_inputs()
            .map(|s| UnlinkedInput {
                socket: s.id,
                ty: s.ty,
                default: SocketValue::zero(s.ty),
                node_kind: "rotate".to_string(),
                socket_name: s.name.clone(),
            })
            .collect();
        (graph, inputs)
    }

    #[test]
    fn value_grouper_merges_equal_defaults() {
        let inputs = vec![
            unlinked(SocketValue::Float(1.0), "a", "x"),
            unlinked(SocketValue::Float(2.0), "a", "x"),
            unlinked(SocketValue::Float(1.0), "b", "y"),
            unlinked(SocketValue::Vector([1.0; 3]), "a", "x"),
        ];
        assert_eq!(ValueGrouper.group(&inputs), vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn kind_grouper_keeps_kinds_apart() {
        let inputs = vec![
            unlinked(SocketValue::Float(1.0), "a", "x"),
            unlinked(SocketValue::Float(1.0), "b", "x"),
            unlinked(SocketValue::Float(1.0), "a", "x"),
        ];
        assert_eq!(NodeKindGrouper.group(&inputs), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn socket_grouper_is_trivial() {
        let inputs = vec![unlinked(SocketValue::Int(1), "a", "x"); 3];
        assert_eq!(SocketGrouper.group(&inputs), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn partition_errors() {
        assert_eq!(
            check_partition(&[vec![0], vec![]], 1),
            Err(UnlinkedError::EmptyGroup { group: 1 })
        );
        assert_eq!(
            check_partition(&[vec![0, 0]], 1),
            Err(UnlinkedError::Duplicate { index: 0 })
        );
        assert_eq!(
            check_partition(&[vec![0]], 2),
            Err(UnlinkedError::Unassigned { index: 1 })
        );
        assert_eq!(
            check_partition(&[vec![3]], 2),
            Err(UnlinkedError::IndexOutOfRange { index: 3, len: 2 })
        );
        assert_eq!(check_partition(&[], 0), Ok(()));
    }

    #[test]
    fn constant_inserter_shares_origins() {
        let (mut graph, inputs) = two_rotates();
        let origins =
            resolve_unlinked(&mut graph, &inputs, &ValueGrouper, &ConstantNodeInserter).unwrap();
        assert_eq!(origins.len(), inputs.len());
        // Zero vector and zero float: two constants shared by ten inputs.
        let constants = graph
            .nodes()
            .iter()
            .filter(|n| matches!(n.node_type, NodeType::Constant { .. }))
            .count();
        assert_eq!(constants, 2);
        assert_eq!(origins[0], origins[1]);
        assert_ne!(origins[0], origins[3]);
    }

    #[test]
    fn loader_inserter_makes_one_node() {
        let (mut graph, inputs) = two_rotates();
        let before = graph.nodes().len();
        let origins =
            resolve_unlinked(&mut graph, &inputs, &SocketGrouper, &LoaderNodeInserter).unwrap();
        assert_eq!(graph.nodes().len(), before + 1);
        let mut distinct = origins.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), inputs.len());
    }

    #[test]
    fn loader_inserter_skips_empty() {
        let mut graph = Graph::new();
        let origins =
            resolve_unlinked(&mut graph, &[], &ValueGrouper, &LoaderNodeInserter).unwrap();
        assert!(origins.is_empty());
        assert!(graph.nodes().is_empty());
    }

    struct Lumping;

    impl UnlinkedInputsGrouper for Lumping {
        fn group(&self, inputs: &[UnlinkedInput]) -> Vec<Vec<usize>> {
            vec![(0..inputs.len()).collect()]
        }
    }

    #[test]
    fn mixed_type_group_is_rejected() {
        let (mut graph, inputs) = two_rotates();
        let err =
            resolve_unlinked(&mut graph, &inputs, &Lumping, &ConstantNodeInserter).unwrap_err();
        assert_eq!(err, UnlinkedError::MixedTypes { group: 0 });
    }

    struct Stingy;

    impl UnlinkedInputsInserter for Stingy {
        fn insert(
            &self,
            _graph: &mut Graph,
            _inputs: &[UnlinkedInput],
            _groups: &[Vec<usize>],
        ) -> Result<Vec<SocketId>, UnlinkedError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn missing_origins_are_rejected() {
        let (mut graph, inputs) = two_rotates();
        let err = resolve_unlinked(&mut graph, &inputs, &ValueGrouper, &Stingy).unwrap_err();
        assert_eq!(
            err,
            UnlinkedError::OriginCount {
                returned: 0,
                groups: 2,
            }
        );
    }
}
