//! Deployment orchestration core.
//!
//! This crate provides:
//! - Configuration loading (chains, asset tables, deployments)
//! - Component descriptors with literal or by-reference arguments
//! - The staged deployment plan for the lending protocol
//! - Wiring call encoding and execution
//! - The sequencer that drives a plan and accumulates the manifest
//!
//! Network access goes through `deployer_chain::ContractDeployer`.

pub mod config;
mod descriptor;
mod error;
mod manifest;
mod pipeline;
pub mod plan;
pub mod units;
mod wiring;

#[cfg(test)]
mod testing;

pub use config::{
    load_deployment, load_deployment_from_env, AssetConfig, AssetKind, DeploymentLoader,
    ProtocolParams, ResolvedChainDetails, ResolvedDeployment,
};
pub use descriptor::{
    encode_constructor_args, resolve_args, ArgSpec, ComponentDescriptor, DescriptorRegistry,
};
pub use error::DeployError;
pub use manifest::{recovery_path, DeploymentManifest, Persisted};
pub use pipeline::{RunFailure, Sequencer, PREFLIGHT_STAGE};
pub use plan::{DeploymentPlan, Stage, Step};
pub use wiring::{MethodSignature, WiringCall, WiringExecutor};
