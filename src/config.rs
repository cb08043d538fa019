//! Harness configuration.
//!
//! Defaults come from the environment (colors only when stderr is a
//! terminal). An optional YAML file can override them, and CLI flags override
//! the file:
//!
//! ```yaml
//! use_colors: false
//! format: json
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::HarnessError;

/// How a run's results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub use_colors: bool,
    pub format: OutputFormat,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            format: OutputFormat::Text,
        }
    }
}

impl HarnessConfig {
    /// Parses a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, HarnessError> {
        serde_yaml::from_str(text).map_err(|e| HarnessError::Config {
            message: format!("invalid config: {}", e),
            source: Some(Box::new(e)),
        })
    }

    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|e| HarnessError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            source: Some(Box::new(e)),
        })?;
        log::debug!("loaded config from {}", path.display());
        Self::from_yaml(&text)
    }
}
