//! Configuration for the evaluation harness.
//!
//! Tunables live in a TOML file (`eval.toml` by default); every section and
//! field is optional and falls back to the reference defaults.
//!
//! ```toml
//! seed = 42
//!
//! [clustering]
//! num_trials = 10
//! sample_size = 16384
//! batch_size = 512
//!
//! [classification]
//! n_experiments = 10
//! samples_per_label = 8
//! k = 3
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::evaluators::{ClassificationParams, ClusteringParams};

/// Harness-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// RNG seed for every stochastic routine. The CLI `--seed` flag
    /// overrides it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub clustering: ClusteringParams,

    #[serde(default)]
    pub classification: ClassificationParams,
}

fn default_seed() -> u64 {
    42
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            clustering: ClusteringParams::default(),
            classification: ClassificationParams::default(),
        }
    }
}

impl EvalConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    /// Load from the default location (./eval.toml) or return defaults.
    pub fn load_default() -> Result<Self> {
        let local_path = Path::new("eval.toml");
        if local_path.exists() {
            return Self::load(local_path);
        }
        Ok(Self::default())
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
