//! Configuration surface.
//!
//! String-keyed config structs with documented serde defaults, loadable from
//! TOML.  The [`settings::Settings`] provider wraps the aggregate config and
//! is the one sanctioned way to observe hot-reloaded values.

mod context;
mod provider;
mod settings;
mod worker;

pub use context::*;
pub use provider::*;
pub use settings::*;
pub use worker::*;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScribeConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl ScribeConfig {
    /// Parse a TOML document.  Unknown keys are ignored, missing keys take
    /// their documented defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("parsing config: {e}")))
    }

    /// Load from a TOML file on disk.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_toml_str(&raw)
    }
}
