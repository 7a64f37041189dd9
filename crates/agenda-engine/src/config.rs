//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default `PRODID` written into generated calendar documents.
pub const DEFAULT_PRODUCT_ID: &str = "-//agenda//agenda-engine//EN";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Value of the `PRODID` property in generated documents.
    pub product_id: String,

    /// Run the conflict scan again when an appointment is updated.
    ///
    /// Off by default: only creation is checked.
    pub recheck_conflicts_on_update: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            recheck_conflicts_on_update: false,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys fall back to their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Builder: set the product identifier.
    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = product_id.into();
        self
    }

    /// Builder: enable or disable the conflict scan on update.
    pub fn with_conflict_recheck(mut self, enabled: bool) -> Self {
        self.recheck_conflicts_on_update = enabled;
        self
    }
}
