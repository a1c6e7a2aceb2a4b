//! Configuration registry for loading and managing configs at runtime.
//!
//! The registry loads chain, asset, and deployment configurations from the
//! config directory and looks them up by name.

use super::{AssetsConfig, ChainConfig, DeploymentConfig};
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration registry for runtime config management.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    /// Chain configurations indexed by config file name (e.g., "development")
    chains: HashMap<String, ChainConfig>,
    /// Asset tables indexed by config file name (e.g., "bifi")
    assets: HashMap<String, AssetsConfig>,
    /// Deployment configurations indexed by deployment name
    deployments: HashMap<String, DeploymentConfig>,
}

impl ConfigRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all configurations from a directory.
    ///
    /// Expected structure:
    /// ```text
    /// config/
    ///   chains/
    ///     development.toml
    ///     goerli.toml
    ///   assets/
    ///     bifi.toml
    ///   deployments/
    ///     bifi-dev.toml
    /// ```
    ///
    /// Files that fail to parse are skipped with a warning; a deployment
    /// that references one fails later at lookup.
    pub fn load_from_dir(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        info!(config_dir = %config_dir.display(), "Loading configuration registry");

        let mut registry = Self::new();

        let chains_dir = config_dir.join("chains");
        if chains_dir.exists() {
            for (name, path) in toml_files(&chains_dir)? {
                match ChainConfig::from_file(&path) {
                    Ok(mut config) => {
                        config.expand_env_vars();
                        debug!(
                            chain_id = config.chain.chain_id,
                            name = %config.chain.name,
                            file = %path.display(),
                            "Loaded chain config"
                        );
                        registry.chains.insert(name, config);
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Failed to load chain config");
                    }
                }
            }
        }

        let assets_dir = config_dir.join("assets");
        if assets_dir.exists() {
            for (name, path) in toml_files(&assets_dir)? {
                match AssetsConfig::from_file(&path) {
                    Ok(config) => {
                        debug!(
                            assets = config.assets.len(),
                            file = %path.display(),
                            "Loaded asset table"
                        );
                        registry.assets.insert(name, config);
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Failed to load asset table");
                    }
                }
            }
        }

        let deployments_dir = config_dir.join("deployments");
        if deployments_dir.exists() {
            for (_, path) in toml_files(&deployments_dir)? {
                match DeploymentConfig::from_file(&path) {
                    Ok(config) => {
                        let name = config.deployment.name.clone();
                        debug!(deployment = %name, file = %path.display(), "Loaded deployment config");
                        registry.deployments.insert(name, config);
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Failed to load deployment config");
                    }
                }
            }
        }

        info!(
            chains = registry.chains.len(),
            assets = registry.assets.len(),
            deployments = registry.deployments.len(),
            "Configuration registry loaded"
        );

        Ok(registry)
    }

    /// Get chain config by name (file stem).
    pub fn get_chain(&self, name: &str) -> Option<&ChainConfig> {
        self.chains.get(name)
    }

    /// Get asset table by name (file stem).
    pub fn get_assets(&self, name: &str) -> Option<&AssetsConfig> {
        self.assets.get(name)
    }

    /// Get deployment config by name.
    pub fn get_deployment(&self, name: &str) -> Option<&DeploymentConfig> {
        self.deployments.get(name)
    }

    /// Get all deployment names, sorted.
    pub fn deployment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.deployments.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get a deployment together with the chain and asset table it names.
    pub fn get_full_deployment(
        &self,
        name: &str,
    ) -> Option<(&DeploymentConfig, &ChainConfig, &AssetsConfig)> {
        let deployment = self.deployments.get(name)?;
        let chain = self.get_chain(&deployment.deployment.chain)?;
        let assets = self.get_assets(&deployment.deployment.assets)?;
        Some((deployment, chain, assets))
    }
}

/// `(file stem, path)` of every `.toml` file in `dir`.
fn toml_files(dir: &Path) -> Result<Vec<(String, std::path::PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "toml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path.clone()));
            }
        }
    }
    files.sort();
    Ok(files)
}
