//! Graph module: the data-flow graph handed to the bytecode compiler.
//!
//! [`Graph`] is the mutable form used while generating; [`Graph::freeze`]
//! validates it into an immutable [`DataFlowGraph`] in which every input has
//! exactly one origin and no node depends on itself.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::node::NodeType;
use crate::socket::{Direction, SocketType};
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// Unique identifier for a socket, across all nodes of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SocketId(pub usize);

/// A typed connection point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Socket {
    /// This socket's id.
    pub id: SocketId,
    /// The owning node.
    pub node: NodeId,
    /// Input or output.
    pub direction: Direction,
    /// Value type.
    pub ty: SocketType,
    /// Socket name.
    pub name: String,
    /// Position among the owning node's sockets of the same direction.
    pub index: usize,
}

/// A node in the graph.
#[derive(Debug, Clone, Serialize)]
pub struct NodeData {
    /// The unique ID of this node.
    pub id: NodeId,
    /// Display name; synthesized nodes get a generated one.
    pub name: String,
    /// The operation this node performs.
    pub node_type: NodeType,
    /// Input sockets, in declaration order.
    pub inputs: Vec<SocketId>,
    /// Output sockets, in declaration order.
    pub outputs: Vec<SocketId>,
    /// Index of the authored node this was built from, if any.
    pub source: Option<usize>,
}

/// Errors that can occur when building or validating the graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Node does not exist.
    #[error("node {0:?} does not exist")]
    InvalidNode(NodeId),
    /// Socket does not exist.
    #[error("socket {0:?} does not exist")]
    InvalidSocket(SocketId),
    /// A link must go from an output to an input.
    #[error("cannot link {from:?} to {to:?}: links go from an output to an input")]
    DirectionMismatch {
        /// Source socket.
        from: SocketId,
        /// Destination socket.
        to: SocketId,
    },
    /// Connected sockets carry different value types.
    #[error("cannot link {from_ty:?} output to {to_ty:?} input")]
    TypeMismatch {
        /// Source socket type.
        from_ty: SocketType,
        /// Destination socket type.
        to_ty: SocketType,
    },
    /// Input socket already has an origin.
    #[error("input {0:?} already has an origin")]
    AlreadyLinked(SocketId),
    /// Input socket has no origin.
    #[error("input '{socket}' of node '{node}' has no origin")]
    MissingOrigin {
        /// Node name.
        node: String,
        /// Socket name.
        socket: String,
    },
    /// The graph contains a dependency cycle.
    #[error("dependency cycle through nodes {nodes:?}")]
    CycleDetected {
        /// Nodes on a cycle or downstream of one.
        nodes: Vec<String>,
    },
}

/// A data-flow graph under construction.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<NodeData>,
    sockets: Vec<Socket>,
    origins: Vec<Option<SocketId>>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with the sockets its type declares.
    pub fn add_node(&mut self, name: &str, node_type: NodeType, source: Option<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut inputs = Vec::new();
        for (index, decl) in node_type.input_sockets().iter().enumerate() {
            inputs.push(self.add_socket(id, Direction::Input, decl.ty, decl.name, index));
        }
        let mut outputs = Vec::new();
        for (index, decl) in node_type.output_sockets().iter().enumerate() {
            outputs.push(self.add_socket(id, Direction::Output, decl.ty, decl.name, index));
        }
        self.nodes.push(NodeData {
            id,
            name: name.to_string(),
            node_type,
            inputs,
            outputs,
            source,
        });
        id
    }

    fn add_socket(
        &mut self,
        node: NodeId,
        direction: Direction,
        ty: SocketType,
        name: &str,
        index: usize,
    ) -> SocketId {
        let id = SocketId(self.sockets.len());
        self.sockets.push(Socket {
            id,
            node,
            direction,
            ty,
            name: name.to_string(),
            index,
        });
        self.origins.push(None);
        id
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes.get(id.0).ok_or(GraphError::InvalidNode(id))
    }

    /// Look up a socket.
    pub fn socket(&self, id: SocketId) -> Result<&Socket, GraphError> {
        self.sockets.get(id.0).ok_or(GraphError::InvalidSocket(id))
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    /// The `index`-th input of `node`.
    pub fn input(&self, node: NodeId, index: usize) -> Option<SocketId> {
        self.nodes.get(node.0)?.inputs.get(index).copied()
    }

    /// The `index`-th output of `node`.
    pub fn output(&self, node: NodeId, index: usize) -> Option<SocketId> {
        self.nodes.get(node.0)?.outputs.get(index).copied()
    }

    /// The origin currently feeding `input`.
    pub fn origin(&self, input: SocketId) -> Option<SocketId> {
        self.origins.get(input.0).copied().flatten()
    }

    /// Connect output `from` to input `to`, validating direction, types and
    /// that `to` has no origin yet.
    pub fn connect(&mut self, from: SocketId, to: SocketId) -> Result<(), GraphError> {
        let from_socket = self.socket(from)?;
        let to_socket = self.socket(to)?;
        if from_socket.direction != Direction::Output || to_socket.direction != Direction::Input {
            return Err(GraphError::DirectionMismatch { from, to });
        }
        if from_socket.ty != to_socket.ty {
            return Err(GraphError::TypeMismatch {
                from_ty: from_socket.ty,
                to_ty: to_socket.ty,
            });
        }
        if self.origins[to.0].is_some() {
            return Err(GraphError::AlreadyLinked(to));
        }
        self.origins[to.0] = Some(from);
        Ok(())
    }

    /// Input sockets with no origin, in node order then socket order.
    pub fn unlinked_inputs(&self) -> impl Iterator<Item = &Socket> {
        self.nodes
            .iter()
            .flat_map(|n| n.inputs.iter())
            .map(|id| &self.sockets[id.0])
            .filter(|s| self.origins[s.id.0].is_none())
    }

    /// Validate and freeze the graph.
    pub fn freeze(self) -> Result<DataFlowGraph, GraphError> {
        check_origins(&self.nodes, &self.sockets, &self.origins)?;
        let order = topo_sort(&self.nodes, &self.sockets, &self.origins)?;
        Ok(DataFlowGraph {
            nodes: self.nodes,
            sockets: self.sockets,
            origins: self.origins,
            order,
        })
    }
}

/// A validated, immutable data-flow graph.
#[derive(Debug, Clone, Serialize)]
pub struct DataFlowGraph {
    nodes: Vec<NodeData>,
    sockets: Vec<Socket>,
    origins: Vec<Option<SocketId>>,
    order: Vec<NodeId>,
}

impl DataFlowGraph {
    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    /// All sockets.
    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    /// Look up a socket.
    pub fn socket(&self, id: SocketId) -> Option<&Socket> {
        self.sockets.get(id.0)
    }

    /// The output feeding `input`.
    pub fn origin(&self, input: SocketId) -> Option<SocketId> {
        self.origins.get(input.0).copied().flatten()
    }

    /// Inputs fed by `output`.
    pub fn targets(&self, output: SocketId) -> impl Iterator<Item = SocketId> + '_ {
        self.origins
            .iter()
            .enumerate()
            .filter(move |(_, o)| **o == Some(output))
            .map(|(i, _)| SocketId(i))
    }

    /// Nodes ordered so every node comes after the nodes feeding it.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Nodes synthesized while resolving unlinked inputs.
    pub fn synthetic_nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.iter().filter(|n| n.node_type.is_synthetic())
    }

    /// Re-check the graph's structural invariants.
    pub fn validate(&self) -> Result<(), GraphError> {
        check_origins(&self.nodes, &self.sockets, &self.origins)?;
        for (index, origin) in self.origins.iter().enumerate() {
            if let Some(origin) = origin {
                let from = self
                    .sockets
                    .get(origin.0)
                    .ok_or(GraphError::InvalidSocket(*origin))?;
                let to = &self.sockets[index];
                if from.direction != Direction::Output {
                    return Err(GraphError::DirectionMismatch {
                        from: *origin,
                        to: to.id,
                    });
                }
                if from.ty != to.ty {
                    return Err(GraphError::TypeMismatch {
                        from_ty: from.ty,
                        to_ty: to.ty,
                    });
                }
            }
        }
        topo_sort(&self.nodes, &self.sockets, &self.origins).map(|_| ())
    }
}

fn check_origins(
    nodes: &[NodeData],
    sockets: &[Socket],
    origins: &[Option<SocketId>],
) -> Result<(), GraphError> {
    for socket in sockets {
        if socket.direction == Direction::Input && origins[socket.id.0].is_none() {
            return Err(GraphError::MissingOrigin {
                node: nodes[socket.node.0].name.clone(),
                socket: socket.name.clone(),
            });
        }
    }
    Ok(())
}

/// Topological sort of nodes (Kahn). Ties resolve by node id, so the order is
/// deterministic.
fn topo_sort(
    nodes: &[NodeData],
    sockets: &[Socket],
    origins: &[Option<SocketId>],
) -> Result<Vec<NodeId>, GraphError> {
    let mut in_degree = vec![0usize; nodes.len()];
    let mut adj: Vec<Vec<NodeId>> = vec![vec![]; nodes.len()];

    for (input, origin) in origins.iter().enumerate() {
        if let Some(origin) = origin {
            let from = sockets[origin.0].node;
            let to = sockets[input].node;
            adj[from.0].push(to);
            in_degree[to.0] += 1;
        }
    }

    let mut queue = VecDeque::new();
    for (i, &deg) in in_degree.iter().enumerate() {
        if deg == 0 {
            queue.push_back(NodeId(i));
        }
    }

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &neighbor in &adj[node.0] {
            in_degree[neighbor.0] -= 1;
            if in_degree[neighbor.0] == 0 {
                queue.push_back(neighbor);
            }
        }
    }

    if order.len() == nodes.len() {
        Ok(order)
    } else {
        let stuck = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg > 0)
            .map(|(i, _)| nodes[i].name.clone())
            .collect();
        Err(GraphError::CycleDetected { nodes: stuck })
    }
}
