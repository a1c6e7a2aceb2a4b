//! Configuration system for deployments.
//!
//! This module provides:
//! - Chain configuration (RPC endpoint, chain id, gas settings)
//! - Asset configuration (per-asset risk parameters, oracles, tokens)
//! - Deployment configuration (protocol parameters, artifact overrides,
//!   and references to the chain and asset table)
//! - Configuration registry and loader for runtime loading

mod asset_config;
mod chain;
mod deployment;
mod loader;
mod registry;

pub use asset_config::{
    AssetConfig, AssetEntry, AssetKind, AssetsConfig, OracleEntry, TokenEntry, MAX_DECIMALS,
};

pub use chain::{ChainConfig, ChainDetails, GasConfig, GasPricingModel, RpcConfig};

pub use deployment::{
    DeploymentConfig, DeploymentDetails, ProtocolParams, ProtocolSettings, RewardToken,
    RewardTokenSettings,
};

pub use registry::ConfigRegistry;

pub use loader::{
    load_deployment, load_deployment_from_env, ChainDetails as ResolvedChainDetails,
    DeploymentLoader, ResolvedDeployment, DEFAULT_DEPLOYMENT,
};
