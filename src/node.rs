//! Node catalog: what each authored node kind becomes in the data-flow graph.

#![forbid(unsafe_code)]

use crate::kernel::RotateMode;
use crate::socket::{SocketType, SocketValue};
use crate::vtree::VirtualNode;
use serde::ser::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// A socket declared by a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketDecl {
    /// Socket name as it appears on the authored node.
    pub name: &'static str,
    /// Value type.
    pub ty: SocketType,
}

const fn decl(name: &'static str, ty: SocketType) -> SocketDecl {
    SocketDecl { name, ty }
}

const SOCKETS_NONE: &[SocketDecl] = &[];
const VALUE_OUT: &[SocketDecl] = &[decl("Value", SocketType::Float)];
const VECTOR_OUT: &[SocketDecl] = &[decl("Vector", SocketType::Vector)];
const VECTOR_IN: &[SocketDecl] = &[decl("Vector", SocketType::Vector)];
const COMBINE_XYZ_IN: &[SocketDecl] = &[
    decl("X", SocketType::Float),
    decl("Y", SocketType::Float),
    decl("Z", SocketType::Float),
];
const VECTOR_ROTATE_IN: &[SocketDecl] = &[
    decl("Vector", SocketType::Vector),
    decl("Center", SocketType::Vector),
    decl("Axis", SocketType::Vector),
    decl("Angle", SocketType::Float),
    decl("Rotation", SocketType::Vector),
];

/// Authored kind identifiers of the built-in nodes.
pub mod idname {
    /// Float constant.
    pub const VALUE: &str = "ShaderNodeValue";
    /// Three floats to a vector.
    pub const COMBINE_XYZ: &str = "ShaderNodeCombineXYZ";
    /// Vector rotate.
    pub const VECTOR_ROTATE: &str = "ShaderNodeVectorRotate";
    /// Group output sink.
    pub const GROUP_OUTPUT: &str = "NodeGroupOutput";
}

/// Object-safe definition of an externally provided node kind.
pub trait NodeDef: Send + Sync {
    /// Authored kind identifier this definition answers to.
    fn idname(&self) -> &str;
    /// Declared inputs, in socket order.
    fn inputs(&self) -> &'static [SocketDecl];
    /// Declared outputs, in socket order.
    fn outputs(&self) -> &'static [SocketDecl];
}

/// The operation a data-flow node performs.
#[non_exhaustive]
#[derive(Clone)]
pub enum NodeType {
    /// Float constant set on the authored node.
    Value {
        /// The constant.
        value: f32,
    },
    /// Builds a vector from three floats.
    CombineXyz,
    /// Vector rotation.
    VectorRotate {
        /// Rotation mode.
        mode: RotateMode,
    },
    /// Sink that consumes a vector.
    GroupOutput,
    /// Synthesized constant source feeding one group of unlinked inputs.
    Constant {
        /// The constant.
        value: SocketValue,
    },
    /// Synthesized default loader with one output per group of unlinked inputs.
    DefaultLoader {
        /// One value per output, in output order.
        values: Vec<SocketValue>,
    },
    /// Kind registered through [`NodeCatalog::register`].
    External {
        /// The node definition.
        def: Arc<dyn NodeDef>,
    },
}

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Value { value } => write!(f, "Value({value})"),
            NodeType::CombineXyz => write!(f, "CombineXyz"),
            NodeType::VectorRotate { mode } => write!(f, "VectorRotate({mode:?})"),
            NodeType::GroupOutput => write!(f, "GroupOutput"),
            NodeType::Constant { value } => write!(f, "Constant({value:?})"),
            NodeType::DefaultLoader { values } => write!(f, "DefaultLoader({})", values.len()),
            NodeType::External { def } => write!(f, "External({})", def.idname()),
        }
    }
}

impl NodeType {
    /// Short kind name, used in diagnostics and by kind-based grouping.
    pub fn kind_name(&self) -> &str {
        match self {
            NodeType::Value { .. } => idname::VALUE,
            NodeType::CombineXyz => idname::COMBINE_XYZ,
            NodeType::VectorRotate { .. } => idname::VECTOR_ROTATE,
            NodeType::GroupOutput => idname::GROUP_OUTPUT,
            NodeType::Constant { .. } => "Constant",
            NodeType::DefaultLoader { .. } => "DefaultLoader",
            NodeType::External { def } => def.idname(),
        }
    }

    /// `true` for nodes created during unlinked-input resolution.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeType::Constant { .. } | NodeType::DefaultLoader { .. })
    }

    /// Input sockets of this node type.
    pub fn input_sockets(&self) -> &'static [SocketDecl] {
        match self {
            NodeType::Value { .. } => SOCKETS_NONE,
            NodeType::CombineXyz => COMBINE_XYZ_IN,
            NodeType::VectorRotate { .. } => VECTOR_ROTATE_IN,
            NodeType::GroupOutput => VECTOR_IN,
            NodeType::Constant { .. } | NodeType::DefaultLoader { .. } => SOCKETS_NONE,
            NodeType::External { def } => def.inputs(),
        }
    }

    /// Output sockets of this node type.
    pub fn output_sockets(&self) -> Cow<'static, [SocketDecl]> {
        match self {
            NodeType::Value { .. } => Cow::Borrowed(VALUE_OUT),
            NodeType::CombineXyz | NodeType::VectorRotate { .. } => Cow::Borrowed(VECTOR_OUT),
            NodeType::GroupOutput => Cow::Borrowed(SOCKETS_NONE),
            NodeType::Constant { value } => Cow::Owned(vec![decl("Value", value.value_type())]),
            NodeType::DefaultLoader { values } => Cow::Owned(
                values
                    .iter()
                    .map(|v| decl("Value", v.value_type()))
                    .collect(),
            ),
            NodeType::External { def } => Cow::Borrowed(def.outputs()),
        }
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum NodeTypeRepr<'a> {
    Value { value: f32 },
    CombineXyz,
    VectorRotate { mode: RotateMode },
    GroupOutput,
    Constant { value: &'a SocketValue },
    DefaultLoader { values: &'a [SocketValue] },
    External { idname: &'a str },
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            NodeType::Value { value } => NodeTypeRepr::Value { value: *value },
            NodeType::CombineXyz => NodeTypeRepr::CombineXyz,
            NodeType::VectorRotate { mode } => NodeTypeRepr::VectorRotate { mode: *mode },
            NodeType::GroupOutput => NodeTypeRepr::GroupOutput,
            NodeType::Constant { value } => NodeTypeRepr::Constant { value },
            NodeType::DefaultLoader { values } => NodeTypeRepr::DefaultLoader { values },
            NodeType::External { def } => NodeTypeRepr::External {
                idname: def.idname(),
            },
        };
        repr.serialize(serializer)
    }
}

/// Errors resolving an authored node to a [`NodeType`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// No built-in or registered kind has this identifier.
    #[error("unknown node kind '{0}'")]
    UnknownKind(String),
    /// A property is missing its expected form.
    #[error("invalid value '{value}' for property '{property}'")]
    InvalidProperty {
        /// Property name.
        property: String,
        /// Offending value.
        value: String,
    },
}

/// Maps authored kind identifiers to node types.
#[derive(Clone, Default)]
pub struct NodeCatalog {
    external: BTreeMap<String, Arc<dyn NodeDef>>,
}

impl std::fmt::Debug for NodeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCatalog")
            .field("external", &self.external.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeCatalog {
    /// A catalog holding only the built-in kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an external node kind. A later registration with the same
    /// identifier replaces the earlier one; built-in identifiers cannot be
    /// overridden.
    pub fn register<T: NodeDef + 'static>(&mut self, def: T) {
        self.external.insert(def.idname().to_string(), Arc::new(def));
    }

    /// Resolve an authored node.
    pub fn resolve(&self, node: &VirtualNode) -> Result<NodeType, ResolveError> {
        match node.idname.as_str() {
            idname::VALUE => {
                let value = match node.properties.get("value") {
                    Some(raw) => parse_property("value", raw)?,
                    None => 0.0,
                };
                Ok(NodeType::Value { value })
            }
            idname::COMBINE_XYZ => Ok(NodeType::CombineXyz),
            idname::VECTOR_ROTATE => {
                let mode = match node.properties.get("rotation_type") {
                    Some(raw) => {
                        RotateMode::from_property(raw).ok_or_else(|| ResolveError::InvalidProperty {
                            property: "rotation_type".to_string(),
                            value: raw.clone(),
                        })?
                    }
                    None => RotateMode::default(),
                };
                Ok(NodeType::VectorRotate { mode })
            }
            idname::GROUP_OUTPUT => Ok(NodeType::GroupOutput),
            other => self
                .external
                .get(other)
                .map(|def| NodeType::External { def: def.clone() })
                .ok_or_else(|| ResolveError::UnknownKind(other.to_string())),
        }
    }

    /// Declared sockets for an identifier, if it is known. Properties are not
    /// consulted, so every kind must keep a fixed socket layout.
    pub fn declared_sockets(
        &self,
        kind: &str,
    ) -> Option<(&'static [SocketDecl], Cow<'static, [SocketDecl]>)> {
        let probe = VirtualNode {
            name: String::new(),
            idname: kind.to_string(),
            properties: BTreeMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        let node_type = self.resolve(&probe).ok()?;
        Some((node_type.input_sockets(), node_type.output_sockets()))
    }
}

fn parse_property(property: &str, raw: &str) -> Result<f32, ResolveError> {
    raw.trim()
        .parse::<f32>()
        .map_err(|_| ResolveError::InvalidProperty {
            property: property.to_string(),
            value: raw.to_string(),
        })
}
