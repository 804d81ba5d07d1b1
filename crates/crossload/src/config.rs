//! Engine configuration (crossload.toml)
//!
//! ```toml
//! [cloning]
//! policy = "selective"      # or "exhaustive"
//!
//! [cloning.fallback]
//! enabled = true
//! scope = "recoverable"     # or "any"
//! max_nodes = 1048576
//! ```

use std::path::Path;
use std::sync::Arc;

use crossload_clone::marshal::DEFAULT_MAX_NODES;
use crossload_clone::{
    CloningStrategy, DecisionKind, FallbackScope, MarshalCloner, ReflectionCloner,
};
use crossload_core::BypassInstantiator;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to render TOML
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossloadConfig {
    /// Cloning behaviour, shared by `clone_into` and invocation
    #[serde(default)]
    pub cloning: CloningConfig,
}

/// Cloning configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloningConfig {
    /// Clone-vs-reuse policy
    #[serde(default)]
    pub policy: DecisionKind,

    /// Per-node fallback
    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// Fallback configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Hand failing nodes to the marshalling transport
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Which failures trigger the fallback
    #[serde(default)]
    pub scope: FallbackScope,

    /// Largest graph the transport accepts
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_max_nodes() -> usize {
    DEFAULT_MAX_NODES
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            scope: FallbackScope::default(),
            max_nodes: default_max_nodes(),
        }
    }
}

impl CrossloadConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CrossloadConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cloning.fallback.max_nodes == 0 {
            return Err(ConfigError::Invalid(
                "cloning.fallback.max_nodes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the cloning strategy this configuration describes
    pub fn build_cloner(&self) -> ReflectionCloner {
        let fallback = &self.cloning.fallback;
        let marshal: Option<Arc<dyn CloningStrategy>> = if fallback.enabled {
            Some(Arc::new(MarshalCloner::new(fallback.max_nodes)))
        } else {
            None
        };
        ReflectionCloner::new(
            self.cloning.policy.policy(),
            Arc::new(BypassInstantiator),
            marshal,
        )
        .with_fallback_scope(fallback.scope)
    }
}
