//! Sequential execution of a deployment plan.
//!
//! One step at a time, each awaited to a confirmed result. The manifest is
//! passed by value from stage to stage; a failed step hands back whatever
//! was confirmed so far inside the [`RunFailure`].

use deployer_chain::ContractDeployer;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use crate::descriptor::DescriptorRegistry;
use crate::error::DeployError;
use crate::manifest::DeploymentManifest;
use crate::plan::{DeploymentPlan, Stage, Step};
use crate::wiring::WiringExecutor;

/// Stage name reported for failures caught before the first stage.
pub const PREFLIGHT_STAGE: &str = "preflight";

/// An aborted run.
#[derive(Debug, Error)]
#[error("stage {stage} failed at {step}: {error}")]
pub struct RunFailure {
    /// Stage that was running
    pub stage: String,
    /// Step that failed
    pub step: String,
    #[source]
    pub error: DeployError,
    /// Components confirmed before the failure
    pub manifest: DeploymentManifest,
}

/// Drives a [`DeploymentPlan`] through a [`ContractDeployer`].
pub struct Sequencer<'a> {
    deployer: &'a dyn ContractDeployer,
}

impl<'a> Sequencer<'a> {
    pub fn new(deployer: &'a dyn ContractDeployer) -> Self {
        Self { deployer }
    }

    /// Run every stage in order. The plan is verified first, so an ordering
    /// defect aborts before anything is sent.
    pub async fn run(&self, plan: &mut DeploymentPlan) -> Result<DeploymentManifest, RunFailure> {
        if let Err(error) = plan.verify() {
            return Err(RunFailure {
                stage: PREFLIGHT_STAGE.to_string(),
                step: "verify".to_string(),
                error,
                manifest: DeploymentManifest::new(),
            });
        }

        let started = Instant::now();
        let (registry, stages) = plan.parts_mut();
        info!(stages = stages.len(), components = registry.len(), "Starting deployment");

        let mut manifest = DeploymentManifest::new();
        for stage in stages {
            manifest = self.run_stage(stage, registry, manifest).await?;
        }

        let missing = manifest.missing(registry.names());
        if !missing.is_empty() {
            return Err(RunFailure {
                stage: "complete".to_string(),
                step: "manifest check".to_string(),
                error: DeployError::IncompleteManifest { names: missing },
                manifest,
            });
        }

        info!(
            components = manifest.len(),
            elapsed_secs = started.elapsed().as_secs(),
            "Deployment complete"
        );
        Ok(manifest)
    }

    async fn run_stage(
        &self,
        stage: &Stage,
        registry: &mut DescriptorRegistry,
        mut manifest: DeploymentManifest,
    ) -> Result<DeploymentManifest, RunFailure> {
        info!(stage = %stage.name, steps = stage.steps.len(), "Stage started");

        for step in &stage.steps {
            if let Err(error) = self.run_step(step, registry, &mut manifest).await {
                error!(
                    stage = %stage.name,
                    step = %step,
                    kind = error.kind(),
                    error = %error,
                    confirmed = manifest.len(),
                    "Deployment aborted"
                );
                return Err(RunFailure {
                    stage: stage.name.clone(),
                    step: step.to_string(),
                    error,
                    manifest,
                });
            }
        }

        info!(stage = %stage.name, "Stage complete");
        Ok(manifest)
    }

    async fn run_step(
        &self,
        step: &Step,
        registry: &mut DescriptorRegistry,
        manifest: &mut DeploymentManifest,
    ) -> Result<(), DeployError> {
        match step {
            Step::Create(name) => {
                let descriptor = registry
                    .get(name)
                    .ok_or_else(|| DeployError::UnknownComponent { name: name.clone() })?;
                let args = descriptor.encoded_args(manifest)?;

                let creation = self
                    .deployer
                    .create(&descriptor.artifact, args)
                    .await
                    .map_err(|e| DeployError::Deployment {
                        component: name.clone(),
                        reason: format!("{:#}", e),
                    })?;
                let address = creation.address.ok_or_else(|| DeployError::MissingAddress {
                    component: name.clone(),
                })?;

                manifest.record(name, address)?;
                registry.mark_deployed(name, address)?;
                info!(
                    component = %name,
                    address = %address,
                    tx_hash = %creation.tx_hash,
                    "Component deployed"
                );
            }
            Step::Call(call) => {
                WiringExecutor::new(self.deployer)
                    .execute(call, manifest)
                    .await?;
            }
        }
        Ok(())
    }
}
