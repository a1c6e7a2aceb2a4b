//! Unified deployment loader that ties together all configuration.
//!
//! Single entry point for everything a run needs: resolved chain endpoint
//! and fee policy, validated asset table, protocol parameters, artifact
//! overrides, and output paths.

use super::{
    AssetConfig, ChainConfig, ConfigRegistry, DeploymentConfig, GasConfig, ProtocolParams,
};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Deployment used when `DEPLOYMENT` is unset.
pub const DEFAULT_DEPLOYMENT: &str = "bifi-dev";

/// Fully resolved deployment configuration.
#[derive(Debug, Clone)]
pub struct ResolvedDeployment {
    /// Deployment name
    pub name: String,
    /// Chain configuration
    pub chain: ChainDetails,
    /// Protocol parameters
    pub protocol: ProtocolParams,
    /// Validated assets in index order
    pub assets: Vec<AssetConfig>,
    /// Component name -> artifact name overrides
    pub artifacts: BTreeMap<String, String>,
    /// Directory of compiled artifacts
    pub artifacts_dir: PathBuf,
    /// Where the manifest is written
    pub manifest_path: PathBuf,
}

/// Resolved chain details.
#[derive(Debug, Clone)]
pub struct ChainDetails {
    /// Chain ID
    pub chain_id: u64,
    /// Chain name
    pub name: String,
    /// Native token symbol
    pub native_token: String,
    /// HTTP RPC endpoint, env vars expanded
    pub rpc_url: String,
    /// Gas configuration
    pub gas: GasConfig,
}

/// Deployment loader for unified configuration.
pub struct DeploymentLoader {
    /// Config registry
    registry: ConfigRegistry,
}

impl DeploymentLoader {
    /// Create a new deployment loader from a config directory.
    pub fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        let registry = ConfigRegistry::load_from_dir(config_dir.as_ref())
            .context("Failed to load config registry")?;
        Ok(Self { registry })
    }

    /// Load a deployment by name.
    ///
    /// Resolves the deployment file and the chain and asset table it
    /// references. All parameter validation happens here, before any
    /// network interaction.
    pub fn load(&self, deployment_name: &str) -> Result<ResolvedDeployment> {
        info!(deployment = deployment_name, "Loading deployment configuration");

        let (deployment, chain_config, assets_config) = self
            .registry
            .get_full_deployment(deployment_name)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Deployment '{}' not found or references a missing chain/asset config (available: {:?})",
                    deployment_name,
                    self.registry.deployment_names()
                )
            })?;

        let assets = assets_config.resolve()?;
        let protocol = deployment.protocol.resolve()?;
        let chain = resolve_chain(chain_config);

        info!(
            deployment = deployment_name,
            chain = %chain.name,
            chain_id = chain.chain_id,
            assets = assets.len(),
            "Deployment configuration resolved"
        );

        Ok(resolved(deployment_name, deployment, chain, protocol, assets))
    }

    /// Load deployment from environment variable DEPLOYMENT.
    pub fn load_from_env(&self) -> Result<ResolvedDeployment> {
        let deployment_name =
            std::env::var("DEPLOYMENT").unwrap_or_else(|_| DEFAULT_DEPLOYMENT.to_string());
        self.load(&deployment_name)
    }

    /// Get the config registry for direct access.
    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }
}

fn resolve_chain(config: &ChainConfig) -> ChainDetails {
    ChainDetails {
        chain_id: config.chain.chain_id,
        name: config.chain.name.clone(),
        native_token: config.chain.native_token.clone(),
        rpc_url: config.chain.rpc.http.clone(),
        gas: config.chain.gas.clone(),
    }
}

fn resolved(
    name: &str,
    deployment: &DeploymentConfig,
    chain: ChainDetails,
    protocol: ProtocolParams,
    assets: Vec<AssetConfig>,
) -> ResolvedDeployment {
    ResolvedDeployment {
        name: name.to_string(),
        chain,
        protocol,
        assets,
        artifacts: deployment.artifacts.clone(),
        artifacts_dir: PathBuf::from(&deployment.deployment.artifacts_dir),
        manifest_path: PathBuf::from(&deployment.deployment.manifest),
    }
}

/// Load a deployment from the default config directory.
///
/// Uses CONFIG_DIR env var or defaults to "./config".
pub fn load_deployment(deployment_name: &str) -> Result<ResolvedDeployment> {
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".to_string());
    let loader = DeploymentLoader::new(&config_dir)?;
    loader.load(deployment_name)
}

/// Load deployment from DEPLOYMENT env var.
pub fn load_deployment_from_env() -> Result<ResolvedDeployment> {
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".to_string());
    let loader = DeploymentLoader::new(&config_dir)?;
    loader.load_from_env()
}
