//! Graph generation: authored tree in, validated data-flow graph out.

use crate::graph::{DataFlowGraph, Graph, GraphError};
use crate::invariant_ppt::{
    assert_invariant, BUILD_REJECTS_INVALID, GRAPH_ACYCLIC, SINGLE_ORIGIN_PER_INPUT,
};
use crate::node::{NodeCatalog, ResolveError, SocketDecl};
use crate::socket::{SocketType, SocketValue};
use crate::unlinked::{
    resolve_unlinked, ConstantNodeInserter, UnlinkedError, UnlinkedInput, UnlinkedInputsGrouper,
    UnlinkedInputsInserter, ValueGrouper,
};
use crate::vtree::{VirtualLink, VirtualNode, VirtualNodeTree, VirtualSocket};
use thiserror::Error;

/// Reasons a tree cannot become a data-flow graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphBuildError {
    /// No built-in or registered kind matches the node's identifier.
    #[error("node '{node}' has unknown kind '{kind}'")]
    UnknownNodeKind {
        /// Authored node name.
        node: String,
        /// Kind identifier.
        kind: String,
    },
    /// A kind-specific property could not be parsed.
    #[error("node '{node}': invalid value '{value}' for property '{property}'")]
    InvalidProperty {
        /// Authored node name.
        node: String,
        /// Property name.
        property: String,
        /// Offending value.
        value: String,
    },
    /// The authored sockets do not match what the kind declares.
    #[error("node '{node}': {detail}")]
    SocketLayout {
        /// Authored node name.
        node: String,
        /// What differs.
        detail: String,
    },
    /// A link refers to a node or socket that does not exist.
    #[error("link {link}: {reason}")]
    InvalidLink {
        /// Index of the link in the tree.
        link: usize,
        /// What is missing.
        reason: String,
    },
    /// A link or origin joins sockets of different types.
    #[error("cannot feed {from} ({from_ty:?}) into {to} ({to_ty:?})")]
    TypeMismatch {
        /// Source, as `node.socket`.
        from: String,
        /// Source type.
        from_ty: SocketType,
        /// Destination, as `node.socket`.
        to: String,
        /// Destination type.
        to_ty: SocketType,
    },
    /// An input has more than one incoming link.
    #[error("input '{socket}' of node '{node}' has more than one incoming link")]
    MultipleLinks {
        /// Authored node name.
        node: String,
        /// Socket name.
        socket: String,
    },
    /// A default value cannot be converted to its socket's type.
    #[error("default of input '{socket}' on node '{node}' is {found:?}, expected {expected:?}")]
    InvalidDefault {
        /// Authored node name.
        node: String,
        /// Socket name.
        socket: String,
        /// Socket type.
        expected: SocketType,
        /// Type of the authored default.
        found: SocketType,
    },
    /// The grouping strategy broke its contract.
    #[error("grouping failed: {0}")]
    Grouping(UnlinkedError),
    /// The insertion strategy broke its contract.
    #[error("insertion failed: {0}")]
    Insertion(UnlinkedError),
    /// The links form a cycle.
    #[error("dependency cycle through nodes {nodes:?}")]
    CyclicDependency {
        /// Nodes on a cycle or downstream of one.
        nodes: Vec<String>,
    },
    /// Structural graph error.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl From<UnlinkedError> for GraphBuildError {
    fn from(err: UnlinkedError) -> Self {
        match err {
            UnlinkedError::EmptyGroup { .. }
            | UnlinkedError::IndexOutOfRange { .. }
            | UnlinkedError::Duplicate { .. }
            | UnlinkedError::Unassigned { .. }
            | UnlinkedError::MixedTypes { .. } => GraphBuildError::Grouping(err),
            UnlinkedError::Graph(inner) => GraphBuildError::Graph(inner),
            other => GraphBuildError::Insertion(other),
        }
    }
}

/// Strategies and catalog used by [`generate_graph_with`].
pub struct GenerateOptions {
    /// Resolves authored kinds.
    pub catalog: NodeCatalog,
    /// Decides which unlinked inputs share a source.
    pub grouper: Box<dyn UnlinkedInputsGrouper>,
    /// Creates the sources.
    pub inserter: Box<dyn UnlinkedInputsInserter>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            catalog: NodeCatalog::new(),
            grouper: Box::new(ValueGrouper),
            inserter: Box::new(ConstantNodeInserter),
        }
    }
}

impl std::fmt::Debug for GenerateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateOptions")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

/// Build a data-flow graph from `tree` with the built-in catalog, sharing one
/// constant node between all unlinked inputs with equal defaults.
pub fn generate_graph(tree: &VirtualNodeTree) -> Result<DataFlowGraph, GraphBuildError> {
    generate_graph_with(tree, &GenerateOptions::default())
}

/// Build a data-flow graph from `tree` with explicit options.
///
/// The tree is never modified; on error no partial graph is returned.
pub fn generate_graph_with(
    tree: &VirtualNodeTree,
    options: &GenerateOptions,
) -> Result<DataFlowGraph, GraphBuildError> {
    let result = GraphBuilder::new(tree, options).build();
    if let Err(err) = &result {
        tracing::warn!(error = %err, "node tree rejected");
        assert_invariant(
            BUILD_REJECTS_INVALID,
            true,
            "Invalid tree rejected",
            Some("generate_graph"),
        );
    }
    result
}

struct GraphBuilder<'a> {
    tree: &'a VirtualNodeTree,
    options: &'a GenerateOptions,
    graph: Graph,
}

impl<'a> GraphBuilder<'a> {
    fn new(tree: &'a VirtualNodeTree, options: &'a GenerateOptions) -> Self {
        Self {
            tree,
            options,
            graph: Graph::new(),
        }
    }

    fn build(mut self) -> Result<DataFlowGraph, GraphBuildError> {
        let tree = self.tree;
        tracing::debug!(
            nodes = tree.nodes.len(),
            links = tree.links.len(),
            "generating graph"
        );
        for (index, node) in tree.nodes.iter().enumerate() {
            self.add_node(index, node)?;
        }
        for (index, link) in tree.links.iter().enumerate() {
            self.add_link(index, link)?;
        }

        let unlinked = self.collect_unlinked()?;
        let origins = resolve_unlinked(
            &mut self.graph,
            &unlinked,
            self.options.grouper.as_ref(),
            self.options.inserter.as_ref(),
        )?;
        for (input, &origin) in unlinked.iter().zip(&origins) {
            self.graph.connect(origin, input.socket)?;
        }
        let synthetic = self
            .graph
            .nodes()
            .iter()
            .filter(|n| n.node_type.is_synthetic())
            .count();
        tracing::debug!(
            unlinked = unlinked.len(),
            synthetic,
            "unlinked inputs resolved"
        );

        let graph = self.graph.freeze().map_err(|err| match err {
            GraphError::CycleDetected { nodes } => GraphBuildError::CyclicDependency { nodes },
            other => GraphBuildError::Graph(other),
        })?;
        assert_invariant(
            GRAPH_ACYCLIC,
            graph.topological_order().len() == graph.nodes().len(),
            "Generated graph is acyclic",
            Some("generate_graph"),
        );
        assert_invariant(
            SINGLE_ORIGIN_PER_INPUT,
            graph.validate().is_ok(),
            "Every input has exactly one origin",
            Some("generate_graph"),
        );
        Ok(graph)
    }

    fn add_node(&mut self, index: usize, node: &VirtualNode) -> Result<(), GraphBuildError> {
        let node_type = self
            .options
            .catalog
            .resolve(node)
            .map_err(|err| match err {
                ResolveError::UnknownKind(kind) => GraphBuildError::UnknownNodeKind {
                    node: node.name.clone(),
                    kind,
                },
                ResolveError::InvalidProperty { property, value } => {
                    GraphBuildError::InvalidProperty {
                        node: node.name.clone(),
                        property,
                        value,
                    }
                }
            })?;
        check_layout(node, "input", &node.inputs, node_type.input_sockets())?;
        check_layout(node, "output", &node.outputs, &node_type.output_sockets())?;
        self.graph.add_node(&node.name, node_type, Some(index));
        Ok(())
    }

    fn add_link(&mut self, index: usize, link: &VirtualLink) -> Result<(), GraphBuildError> {
        let invalid = |reason: String| GraphBuildError::InvalidLink {
            link: index,
            reason,
        };
        let from_node = self
            .graph
            .nodes()
            .get(link.from_node)
            .ok_or_else(|| invalid(format!("no source node {}", link.from_node)))?;
        let to_node = self
            .graph
            .nodes()
            .get(link.to_node)
            .ok_or_else(|| invalid(format!("no destination node {}", link.to_node)))?;
        let from = *from_node.outputs.get(link.from_socket).ok_or_else(|| {
            invalid(format!(
                "node '{}' has no output {}",
                from_node.name, link.from_socket
            ))
        })?;
        let to = *to_node.inputs.get(link.to_socket).ok_or_else(|| {
            invalid(format!(
                "node '{}' has no input {}",
                to_node.name, link.to_socket
            ))
        })?;

        let from_socket = self.graph.socket(from)?;
        let to_socket = self.graph.socket(to)?;
        if from_socket.ty != to_socket.ty {
            return Err(GraphBuildError::TypeMismatch {
                from: format!("{}.{}", from_node.name, from_socket.name),
                from_ty: from_socket.ty,
                to: format!("{}.{}", to_node.name, to_socket.name),
                to_ty: to_socket.ty,
            });
        }
        if self.graph.origin(to).is_some() {
            return Err(GraphBuildError::MultipleLinks {
                node: to_node.name.clone(),
                socket: to_socket.name.clone(),
            });
        }
        self.graph.connect(from, to)?;
        Ok(())
    }

    /// Unlinked inputs in node order then socket order, with their defaults.
    fn collect_unlinked(&self) -> Result<Vec<UnlinkedInput>, GraphBuildError> {
        let mut unlinked = Vec::new();
        for socket in self.graph.unlinked_inputs() {
            let node = self.graph.node(socket.node)?;
            let authored = node
                .source
                .and_then(|source| self.tree.nodes.get(source))
                .and_then(|n| n.inputs.get(socket.index));
            let default = match authored.and_then(|s| s.default) {
                None => SocketValue::zero(socket.ty),
                Some(value) => {
                    value
                        .coerce(socket.ty)
                        .ok_or_else(|| GraphBuildError::InvalidDefault {
                            node: node.name.clone(),
                            socket: socket.name.clone(),
                            expected: socket.ty,
                            found: value.value_type(),
                        })?
                }
            };
            unlinked.push(UnlinkedInput {
                socket: socket.id,
                ty: socket.ty,
                default,
                node_kind: node.node_type.kind_name().to_string(),
                socket_name: socket.name.clone(),
            });
        }
        Ok(unlinked)
    }
}

fn check_layout(
    node: &VirtualNode,
    direction: &str,
    authored: &[VirtualSocket],
    declared: &[SocketDecl],
) -> Result<(), GraphBuildError> {
    let layout = |detail: String| GraphBuildError::SocketLayout {
        node: node.name.clone(),
        detail,
    };
    if authored.len() != declared.len() {
        return Err(layout(format!(
            "expected {} {direction} sockets, found {}",
            declared.len(),
            authored.len()
        )));
    }
    for (index, (a, d)) in authored.iter().zip(declared).enumerate() {
        if a.name != d.name || a.ty != d.ty {
            return Err(layout(format!(
                "{direction} {index} is '{}' ({:?}), expected '{}' ({:?})",
                a.name, a.ty, d.name, d.ty
            )));
        }
    }
    Ok(())
}
