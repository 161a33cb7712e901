//! Shading-graph frontend and stack-machine kernel.
//!
//! [`generate_graph`] turns an authored [`VirtualNodeTree`] into a validated
//! [`DataFlowGraph`], giving every unconnected input a constant source. The
//! [`kernel`] evaluates compiled instructions on a per-lane [`RegisterFile`],
//! and [`rt::Runtime`] runs many lanes in parallel.

pub mod builder;
pub mod config;
pub mod graph;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod kernel;
pub mod node;
pub mod rt;
pub mod socket;
pub mod unlinked;
pub mod vtree;

pub use builder::{generate_graph, generate_graph_with, GenerateOptions, GraphBuildError};
pub use config::{ConfigError, ShadeflowConfig};
pub use graph::{DataFlowGraph, GraphError, NodeId, SocketId};
pub use kernel::{Instruction, RegisterFile, RotateMode};
pub use node::{NodeCatalog, NodeDef, NodeType};
pub use socket::{SocketType, SocketValue};
pub use unlinked::{UnlinkedInputsGrouper, UnlinkedInputsInserter};
pub use vtree::{TreeBuilder, VirtualNodeTree};
