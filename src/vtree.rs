//! Virtual node tree: nodes and links as authored.
//!
//! The tree is untrusted input. Links refer to nodes and sockets by index and
//! nothing here checks that they are in range, that kinds exist, or that the
//! topology is acyclic; [`crate::builder::generate_graph`] does that.

use crate::node::NodeCatalog;
use crate::socket::{SocketType, SocketValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// A socket on an authored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualSocket {
    /// Socket name.
    pub name: String,
    /// Value type.
    #[serde(rename = "type")]
    pub ty: SocketType,
    /// Value used when the socket is an input and nothing is linked to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SocketValue>,
}

/// An authored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualNode {
    /// Display name, used in diagnostics.
    pub name: String,
    /// Kind identifier.
    pub idname: String,
    /// Kind-specific settings.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Input sockets.
    #[serde(default)]
    pub inputs: Vec<VirtualSocket>,
    /// Output sockets.
    #[serde(default)]
    pub outputs: Vec<VirtualSocket>,
}

/// A link from an output socket to an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VirtualLink {
    /// Index of the source node.
    pub from_node: usize,
    /// Index of the output socket on the source node.
    pub from_socket: usize,
    /// Index of the destination node.
    pub to_node: usize,
    /// Index of the input socket on the destination node.
    pub to_socket: usize,
}

/// The authored tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualNodeTree {
    /// Nodes in authoring order.
    pub nodes: Vec<VirtualNode>,
    /// Links in authoring order.
    #[serde(default)]
    pub links: Vec<VirtualLink>,
}

/// Handle to a node in the [`TreeBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub usize);

/// Errors raised while authoring a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    /// The handle does not belong to this builder.
    #[error("no node with handle {0}")]
    InvalidHandle(usize),
    /// The node has no socket with this name.
    #[error("node '{node}' has no socket named '{socket}'")]
    UnknownSocket {
        /// Node name.
        node: String,
        /// Socket name.
        socket: String,
    },
    /// No node registered under this name.
    #[error("no node named '{0}'")]
    MissingNode(String),
}

/// Convenience builder for authoring trees in code.
///
/// Nodes of kinds known to the catalog get their declared sockets; unknown
/// kinds start with none and can be filled in with [`Self::add_input`] and
/// [`Self::add_output`].
#[derive(Debug)]
pub struct TreeBuilder {
    tree: VirtualNodeTree,
    catalog: NodeCatalog,
    node_names: HashMap<String, NodeHandle>,
}

impl TreeBuilder {
    /// Builder backed by the built-in catalog.
    pub fn new() -> Self {
        Self::with_catalog(NodeCatalog::new())
    }

    /// Builder backed by `catalog`.
    pub fn with_catalog(catalog: NodeCatalog) -> Self {
        Self {
            tree: VirtualNodeTree::default(),
            catalog,
            node_names: HashMap::new(),
        }
    }

    /// Add a node of kind `idname` named `name`.
    pub fn node(&mut self, name: &str, idname: &str) -> NodeHandle {
        let socket = |d: &crate::node::SocketDecl| VirtualSocket {
            name: d.name.to_string(),
            ty: d.ty,
            default: None,
        };
        let (inputs, outputs) = match self.catalog.declared_sockets(idname) {
            Some((ins, outs)) => (
                ins.iter().map(socket).collect(),
                outs.iter().map(socket).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        let handle = NodeHandle(self.tree.nodes.len());
        self.tree.nodes.push(VirtualNode {
            name: name.to_string(),
            idname: idname.to_string(),
            properties: BTreeMap::new(),
            inputs,
            outputs,
        });
        self.node_names.insert(name.to_string(), handle);
        handle
    }

    /// Look a node up by name.
    pub fn named(&self, name: &str) -> Result<NodeHandle, TreeError> {
        self.node_names
            .get(name)
            .copied()
            .ok_or_else(|| TreeError::MissingNode(name.to_string()))
    }

    /// Set a kind-specific property.
    pub fn property(&mut self, node: NodeHandle, key: &str, value: &str) -> Result<(), TreeError> {
        self.node_mut(node)?
            .properties
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Set the default value of an input socket.
    pub fn default_value(
        &mut self,
        node: NodeHandle,
        socket: &str,
        value: SocketValue,
    ) -> Result<(), TreeError> {
        let index = self.input_index(node, socket)?;
        self.node_mut(node)?.inputs[index].default = Some(value);
        Ok(())
    }

    /// Append an input socket.
    pub fn add_input(
        &mut self,
        node: NodeHandle,
        name: &str,
        ty: SocketType,
    ) -> Result<(), TreeError> {
        self.node_mut(node)?.inputs.push(VirtualSocket {
            name: name.to_string(),
            ty,
            default: None,
        });
        Ok(())
    }

    /// Append an output socket.
    pub fn add_output(
        &mut self,
        node: NodeHandle,
        name: &str,
        ty: SocketType,
    ) -> Result<(), TreeError> {
        self.node_mut(node)?.outputs.push(VirtualSocket {
            name: name.to_string(),
            ty,
            default: None,
        });
        Ok(())
    }

    /// Link the output `from_socket` of `from` to the input `to_socket` of `to`.
    ///
    /// No validation beyond name lookup happens here.
    pub fn link(
        &mut self,
        from: NodeHandle,
        from_socket: &str,
        to: NodeHandle,
        to_socket: &str,
    ) -> Result<(), TreeError> {
        let from_index = {
            let node = self.node_ref(from)?;
            node.outputs
                .iter()
                .position(|s| s.name == from_socket)
                .ok_or_else(|| TreeError::UnknownSocket {
                    node: node.name.clone(),
                    socket: from_socket.to_string(),
                })?
        };
        let to_index = self.input_index(to, to_socket)?;
        self.tree.links.push(VirtualLink {
            from_node: from.0,
            from_socket: from_index,
            to_node: to.0,
            to_socket: to_index,
        });
        Ok(())
    }

    /// Finish authoring.
    pub fn build(self) -> VirtualNodeTree {
        self.tree
    }

    fn input_index(&self, node: NodeHandle, socket: &str) -> Result<usize, TreeError> {
        let data = self.node_ref(node)?;
        data.inputs
            .iter()
            .position(|s| s.name == socket)
            .ok_or_else(|| TreeError::UnknownSocket {
                node: data.name.clone(),
                socket: socket.to_string(),
            })
    }

    fn node_ref(&self, node: NodeHandle) -> Result<&VirtualNode, TreeError> {
        self.tree
            .nodes
            .get(node.0)
            .ok_or(TreeError::InvalidHandle(node.0))
    }

    fn node_mut(&mut self, node: NodeHandle) -> Result<&mut VirtualNode, TreeError> {
        self.tree
            .nodes
            .get_mut(node.0)
            .ok_or(TreeError::InvalidHandle(node.0))
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::idname;

    #[test]
    fn builder_populates_declared_sockets() {
        let mut builder = TreeBuilder::new();
        let rotate = builder.node("Rotate", idname::VECTOR_ROTATE);
        let tree = builder.build();
        let node = &tree.nodes[rotate.0];
        let names: Vec<_> = node.inputs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Vector", "Center", "Axis", "Angle", "Rotation"]);
        assert_eq!(node.outputs.len(), 1);
    }

    #[test]
    fn link_by_name() {
        let mut builder = TreeBuilder::new();
        let value = builder.node("Angle", idname::VALUE);
        let rotate = builder.node("Rotate", idname::VECTOR_ROTATE);
        builder.link(value, "Value", rotate, "Angle").unwrap();
        let tree = builder.build();
        assert_eq!(
            tree.links,
            vec![VirtualLink {
                from_node: 0,
                from_socket: 0,
                to_node: 1,
                to_socket: 3,
            }]
        );
    }

    #[test]
    fn unknown_socket_is_reported() {
        let mut builder = TreeBuilder::new();
        let value = builder.node("Angle", idname::VALUE);
        let rotate = builder.node("Rotate", idname::VECTOR_ROTATE);
        let err = builder.link(value, "Value", rotate, "Pivot").unwrap_err();
        assert_eq!(
            err,
            TreeError::UnknownSocket {
                node: "Rotate".to_string(),
                socket: "Pivot".to_string(),
            }
        );
        assert_eq!(builder.named("Rotate"), Ok(rotate));
        assert!(builder.named("Missing").is_err());
    }

    #[test]
    fn tree_deserializes_from_json() {
        let json = r#"{
            "nodes": [{
                "name": "Rotate",
                "idname": "ShaderNodeVectorRotate",
                "properties": { "rotation_type": "Z_AXIS" },
                "inputs": [
                    { "name": "Vector", "type": "vector", "default": { "vector": [1.0, 0.0, 0.0] } },
                    { "name": "Angle", "type": "float", "default": { "float": 0.5 } }
                ],
                "outputs": [{ "name": "Vector", "type": "vector" }]
            }]
        }"#;
        let tree: VirtualNodeTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.nodes[0].inputs[1].default, Some(SocketValue::Float(0.5)));
        assert!(tree.links.is_empty());
    }
}
