//! Deployment configuration that ties together chain, protocol, and assets.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DeployError;
use crate::units::parse_amount;

/// Full deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment metadata
    pub deployment: DeploymentDetails,
    /// Protocol-level constructor and funding parameters
    pub protocol: ProtocolSettings,
    /// Artifact overrides: component name -> compiled contract name, for
    /// components whose artifact is not named after them
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
}

/// Deployment details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentDetails {
    /// Deployment name (e.g., "bifi-dev")
    pub name: String,
    /// Chain config file name (without extension)
    pub chain: String,
    /// Assets config file name (without extension)
    pub assets: String,
    /// Directory of compiled contract artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,
    /// Manifest output path
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

fn default_artifacts_dir() -> String {
    "build/contracts".to_string()
}

fn default_manifest() -> String {
    "accounts.json".to_string()
}

/// Protocol-level settings as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Label passed to the manager constructor (e.g., "ether")
    pub manager_label: String,
    /// Externally deployed contract the manager is bound to at construction
    pub manager_external: String,
    /// Reward token funding the manager's treasury
    pub reward_token: RewardTokenSettings,
    /// Whole reward tokens transferred to the manager after it is created
    pub treasury_transfer: String,
    /// Component name of the oracle aggregator
    #[serde(default = "default_oracle_proxy")]
    pub oracle_proxy: String,
    /// Component name of the cross-cutting call relay
    #[serde(default = "default_call_proxy")]
    pub call_proxy: String,
}

fn default_oracle_proxy() -> String {
    "OracleProxy".to_string()
}

fn default_call_proxy() -> String {
    "callProxy".to_string()
}

/// Reward token constructor parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTokenSettings {
    /// Component name (e.g., "Bifi")
    pub name: String,
    /// Token name (e.g., "bifi")
    pub label: String,
    /// Ticker (e.g., "BIFI")
    pub symbol: String,
    /// Decimals
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

/// Resolved protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    pub manager_label: String,
    pub manager_external: Address,
    pub reward_token: RewardToken,
    /// Treasury transfer in the reward token's smallest unit
    pub treasury_transfer: U256,
    pub oracle_proxy: String,
    pub call_proxy: String,
}

/// Resolved reward token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardToken {
    pub name: String,
    pub label: String,
    pub symbol: String,
    pub decimals: u8,
}

impl ProtocolSettings {
    /// Parse addresses and amounts.
    pub fn resolve(&self) -> Result<ProtocolParams, DeployError> {
        let manager_external: Address = self.manager_external.parse().map_err(|e| {
            DeployError::config(
                "protocol",
                format!("manager_external {}: {}", self.manager_external, e),
            )
        })?;

        let token = &self.reward_token;
        if token.decimals > crate::config::MAX_DECIMALS {
            return Err(DeployError::config(
                "protocol",
                format!("reward token decimals {} exceeds 18", token.decimals),
            ));
        }

        let treasury_transfer = parse_amount(&self.treasury_transfer, token.decimals)
            .map_err(|e| DeployError::config("protocol", format!("treasury_transfer: {}", e)))?;

        Ok(ProtocolParams {
            manager_label: self.manager_label.clone(),
            manager_external,
            reward_token: RewardToken {
                name: token.name.clone(),
                label: token.label.clone(),
                symbol: token.symbol.clone(),
                decimals: token.decimals,
            },
            treasury_transfer,
            oracle_proxy: self.oracle_proxy.clone(),
            call_proxy: self.call_proxy.clone(),
        })
    }
}

impl DeploymentConfig {
    /// Load deployment config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: DeploymentConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
