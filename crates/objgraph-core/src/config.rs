//! Graph configuration
//!
//! A `GraphConfig` is passed to `ModelGraph::with_config`. Every field has a
//! default, so a TOML document only needs the keys it overrides:
//!
//! ```
//! use objgraph_core::GraphConfig;
//!
//! let config = GraphConfig::from_toml_str("use_id_fragments = false").unwrap();
//! assert!(config.deliver_notifications);
//! assert!(!config.use_id_fragments);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Graph-wide delivery switch; when off no notification is ever built
    pub deliver_notifications: bool,

    /// Maintain each resource's intrinsic id index from the attach hooks
    pub maintain_id_index: bool,

    /// Prefer id fragments over containment paths when building URIs
    pub use_id_fragments: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            deliver_notifications: true,
            maintain_id_index: true,
            use_id_fragments: true,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed TOML, unknown keys or wrong types.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ModelError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Render this configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ModelError::InvalidConfig {
            message: e.to_string(),
        })
    }
}
