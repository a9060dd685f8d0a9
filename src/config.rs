//! Query configuration
//!
//! Read-only settings consulted by the translator and the query provider.
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

/// How nested boolean connectives are laid out in `$match`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectiveFlattening {
    /// Every `&&`/`||` becomes its own two-element array
    Nested,
    /// Chains of the same connective collapse into one array
    #[default]
    Flatten,
    /// Like `Flatten`, and `&&` over distinct fields merges into one document
    Merge,
}

/// Configuration for query translation and execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Layout of boolean connectives
    pub connective_flattening: ConnectiveFlattening,
    /// Log every compiled pipeline at INFO instead of TRACE
    pub log_pipelines: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            connective_flattening: ConnectiveFlattening::Flatten,
            log_pipelines: false,
        }
    }
}

impl QueryConfig {
    /// Parses a config from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns a copy using `mode` for boolean connectives
    pub fn with_flattening(mut self, mode: ConnectiveFlattening) -> Self {
        self.connective_flattening = mode;
        self
    }

    /// Returns a copy that logs compiled pipelines at INFO
    pub fn with_pipeline_logging(mut self) -> Self {
        self.log_pipelines = true;
        self
    }
}
