//! Operator override documents.
//!
//! Overrides come from the operator's configuration as a list of
//! `[[dependency]]` tables (TOML) or a `dependency` array (JSON):
//!
//! ```toml
//! [[dependency]]
//! id = "fmt"
//! platform = "linux-x64"
//! binary_name = "fmt-bin"
//! ```

use serde::{Deserialize, Serialize};

use crate::dependency::DependencyOverride;
use crate::{Error, Result};

/// Ordered list of overrides as written by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideSet {
    /// Overrides in the order they are applied.
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DependencyOverride>,
}

impl OverrideSet {
    /// Parse a TOML override document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| Error::configuration(format!("invalid override document: {e}")))
    }

    /// Parse a JSON override document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed.
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source)
            .map_err(|e| Error::configuration(format!("invalid override document: {e}")))
    }

    /// Consume the set, yielding overrides in application order.
    #[must_use]
    pub fn into_overrides(self) -> Vec<DependencyOverride> {
        self.dependencies
    }
}
