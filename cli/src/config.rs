//! Wallet configuration loaded from `<root-path>/config.yaml`.
//!
//! # Example YAML
//!
//! ```yaml
//! network: testnet11
//! rpc_port: 9256
//! default_fee: 1000
//! fingerprints:
//!   - 123456789
//! ```

use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_command_core::Context;

/// File name looked up under the root path.
pub const CONFIG_FILE: &str = "config.yaml";

/// Failure to load or apply the wallet config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config cannot be represented as context: {0}")]
    Json(#[from] serde_json::Error),
}

/// Contents of `config.yaml`; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Network the wallet talks to.
    pub network: String,
    /// Port of the wallet RPC service.
    pub rpc_port: u16,
    /// Fee in mojos used when `--fee` is not given.
    pub default_fee: u64,
    /// Known wallet key fingerprints.
    pub fingerprints: Vec<u32>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: "mainnet".to_string(),
            rpc_port: 9256,
            default_fee: 0,
            fingerprints: Vec::new(),
        }
    }
}

impl WalletConfig {
    /// Loads the config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `config.yaml` under `root`, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Fills `context` with the root path and every config entry.
    pub fn apply_to(&self, root: &Path, context: &mut Context) -> Result<(), ConfigError> {
        context.insert("root_path", root.display().to_string());
        let values: Context = serde_json::from_value(serde_json::to_value(self)?)?;
        context.extend(values);
        Ok(())
    }
}
