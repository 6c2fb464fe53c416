//! Runtime configuration.
//!
//! The RPC endpoint is always injected through [`TokenOpsConfig`]; nothing
//! in the crate reaches for a hard-coded cluster. Configuration is usually
//! read from a TOML file:
//!
//! ```toml
//! cluster = "devnet"
//! commitment = "confirmed"
//! confirm_timeout_secs = 60
//! poll_interval_ms = 500
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ledger::Commitment;

/// Public Solana clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
}

impl Cluster {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Localnet => "localnet",
        }
    }

    /// Block explorer link for a transaction signature.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        format!("https://explorer.solana.com/tx/{signature}{}", self.explorer_suffix())
    }

    /// Block explorer link for an account or mint address.
    pub fn explorer_address_url(&self, address: &str) -> String {
        format!("https://explorer.solana.com/address/{address}{}", self.explorer_suffix())
    }

    fn explorer_suffix(&self) -> String {
        match self {
            Cluster::MainnetBeta => String::new(),
            Cluster::Localnet => "?cluster=custom&customUrl=http%3A%2F%2F127.0.0.1%3A8899".into(),
            other => format!("?cluster={}", other.as_str()),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::MainnetBeta),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(format!("unknown cluster: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenOpsConfig {
    pub cluster: Cluster,
    /// Overrides the cluster's public endpoint.
    pub rpc_url: Option<String>,
    /// Level every operation waits for, and the level used for reads.
    pub commitment: Commitment,
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Check the sender's token account and balance before building a
    /// transfer instead of leaving that to the ledger.
    pub preflight_source_balance: bool,
}

impl Default for TokenOpsConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            rpc_url: None,
            commitment: Commitment::Confirmed,
            confirm_timeout_secs: 60,
            poll_interval_ms: 500,
            request_timeout_secs: 30,
            preflight_source_balance: false,
        }
    }
}

impl TokenOpsConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirm_timeout_secs == 0 {
            return Err(ConfigError::Invalid("confirm_timeout_secs must be > 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if let Some(url) = &self.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "rpc_url must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_deref().unwrap_or_else(|| self.cluster.rpc_url())
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
