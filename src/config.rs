//! TOML configuration for graph generation and the lane runtime.
//!
//! ```toml
//! [graph]
//! grouping = "by_value"
//! insertion = "constant_nodes"
//!
//! [runtime]
//! worker_threads = 0
//! ```

use crate::builder::GenerateOptions;
use crate::node::NodeCatalog;
use crate::unlinked::{
    ConstantNodeInserter, LoaderNodeInserter, NodeKindGrouper, SocketGrouper,
    UnlinkedInputsGrouper, UnlinkedInputsInserter, ValueGrouper,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on `worker_threads`.
pub const MAX_WORKER_THREADS: usize = 1024;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A setting is out of range.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// How unlinked inputs are grouped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Equal type and value share a source.
    #[default]
    ByValue,
    /// Every input gets its own source.
    PerSocket,
    /// Equal value shares a source only within one node kind and socket name.
    ByNodeKind,
}

/// How sources for unlinked inputs are materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insertion {
    /// One constant node per group.
    #[default]
    ConstantNodes,
    /// A single loader node with one output per group.
    LoaderNode,
}

/// `[graph]` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Grouping strategy.
    pub grouping: Grouping,
    /// Insertion strategy.
    pub insertion: Insertion,
}

impl GraphConfig {
    /// Generation options for these settings, with the built-in catalog.
    pub fn options(&self) -> GenerateOptions {
        self.options_with(NodeCatalog::new())
    }

    /// Generation options for these settings, with `catalog`.
    pub fn options_with(&self, catalog: NodeCatalog) -> GenerateOptions {
        let grouper: Box<dyn UnlinkedInputsGrouper> = match self.grouping {
            Grouping::ByValue => Box::new(ValueGrouper),
            Grouping::PerSocket => Box::new(SocketGrouper),
            Grouping::ByNodeKind => Box::new(NodeKindGrouper),
        };
        let inserter: Box<dyn UnlinkedInputsInserter> = match self.insertion {
            Insertion::ConstantNodes => Box::new(ConstantNodeInserter),
            Insertion::LoaderNode => Box::new(LoaderNodeInserter),
        };
        GenerateOptions {
            catalog,
            grouper,
            inserter,
        }
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for lane evaluation; 0 picks rayon's default.
    pub worker_threads: usize,
}

impl RuntimeConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads > MAX_WORKER_THREADS {
            return Err(ConfigError::InvalidValue {
                key: "runtime.worker_threads".to_string(),
                reason: format!(
                    "{} exceeds the maximum of {MAX_WORKER_THREADS}",
                    self.worker_threads
                ),
            });
        }
        Ok(())
    }

    /// Build the worker pool described by these settings.
    pub fn build_pool(&self) -> Result<rayon::ThreadPool, ConfigError> {
        self.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(|i| format!("shadeflow-lane-{i}"))
            .build()?;
        Ok(pool)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadeflowConfig {
    /// Graph generation settings.
    pub graph: GraphConfig,
    /// Lane runtime settings.
    pub runtime: RuntimeConfig,
}

impl ShadeflowConfig {
    /// Parse and validate a TOML document. Missing sections and keys take
    /// their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src)?;
        config.runtime.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = ShadeflowConfig::from_toml_str("").unwrap();
        assert_eq!(config, ShadeflowConfig::default());
        assert_eq!(config.graph.grouping, Grouping::ByValue);
        assert_eq!(config.graph.insertion, Insertion::ConstantNodes);
    }

    #[test]
    fn parses_all_sections() {
        let config = ShadeflowConfig::from_toml_str(
            r#"
            [graph]
            grouping = "by_node_kind"
            insertion = "loader_node"

            [runtime]
            worker_threads = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.graph.grouping, Grouping::ByNodeKind);
        assert_eq!(config.graph.insertion, Insertion::LoaderNode);
        assert_eq!(config.runtime.worker_threads, 2);
    }

    #[test]
    fn unknown_strategy_is_a_parse_error() {
        let err = ShadeflowConfig::from_toml_str("[graph]\ngrouping = \"random\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn too_many_threads_is_rejected() {
        let err =
            ShadeflowConfig::from_toml_str("[runtime]\nworker_threads = 100000\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn toml_round_trip() {
        let config = ShadeflowConfig {
            graph: GraphConfig {
                grouping: Grouping::PerSocket,
                insertion: Insertion::LoaderNode,
            },
            runtime: RuntimeConfig { worker_threads: 3 },
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ShadeflowConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn pool_has_requested_threads() {
        let pool = RuntimeConfig { worker_threads: 2 }.build_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
