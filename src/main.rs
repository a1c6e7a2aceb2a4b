//! Lending Protocol Deployer
//!
//! Deploys and wires the protocol's contracts in a fixed stage order and
//! writes the resulting address manifest.
//! Features:
//! - Config-driven asset table (one handler stack per asset)
//! - Static plan verification before anything is sent
//! - Partial manifest on abort for recovery
//! - Dry-run mode

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deployer_chain::{ArtifactStore, RpcDeployer, TransactionSenderBuilder};
use deployer_core::{
    load_deployment_from_env, recovery_path, units::wad_to_f64, DeploymentManifest,
    DeploymentPlan, Persisted, ResolvedDeployment, Sequencer,
};

/// Environment variable names.
mod env {
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const DRY_RUN: &str = "DRY_RUN";
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,deployer_core=debug,deployer_chain=debug")
            }),
        )
        .init();

    // CONFIG_DIR and DEPLOYMENT select the configuration
    let deployment = load_deployment_from_env()?;
    log_deployment(&deployment);

    let mut plan = DeploymentPlan::build(
        &deployment.protocol,
        &deployment.assets,
        &deployment.artifacts,
    )?;
    plan.verify()?;
    info!(
        stages = plan.stages().len(),
        components = plan.registry().len(),
        steps = plan.step_count(),
        "Deployment plan verified"
    );

    if dry_run() {
        log_plan(&plan);
        info!("Dry run, nothing sent");
        return Ok(());
    }

    let private_key = std::env::var(env::PRIVATE_KEY)
        .with_context(|| format!("Missing env var: {}", env::PRIVATE_KEY))?;

    let gas = &deployment.chain.gas;
    let sender = TransactionSenderBuilder::new(&deployment.chain.rpc_url, deployment.chain.chain_id)
        .gas_policy(gas.policy())
        .gas_limit(gas.gas_limit)
        .receipt_timeout(gas.receipt_timeout())
        .build(&private_key)
        .await?;

    let balance = sender.balance().await?;
    info!(
        address = %sender.address,
        balance = %alloy::primitives::utils::format_ether(balance),
        nonce = sender.current_nonce(),
        native_token = %deployment.chain.native_token,
        "Deployer account"
    );

    let deployer = RpcDeployer::new(sender, ArtifactStore::new(&deployment.artifacts_dir));

    match Sequencer::new(&deployer).run(&mut plan).await {
        Ok(manifest) => match manifest.write_or_recover(&deployment.manifest_path) {
            Ok(Persisted::Canonical(path)) => {
                info!(
                    path = %path.display(),
                    components = manifest.len(),
                    "Deployment succeeded"
                );
                Ok(())
            }
            Ok(Persisted::Recovery { path, error }) => {
                error!(
                    manifest = %deployment.manifest_path.display(),
                    recovery = %path.display(),
                    components = manifest.len(),
                    error = %error,
                    "Deployment succeeded but the manifest went to the recovery file"
                );
                std::process::exit(1);
            }
            Err(e) => {
                error!(
                    components = manifest.len(),
                    error = %e,
                    "Deployment succeeded but no manifest file could be written"
                );
                dump_manifest(&manifest);
                std::process::exit(1);
            }
        },
        Err(failure) => {
            let path = recovery_path(&deployment.manifest_path);
            match failure.manifest.write(&path) {
                Ok(()) => warn!(
                    path = %path.display(),
                    components = failure.manifest.len(),
                    "Partial manifest written"
                ),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to write partial manifest");
                    dump_manifest(&failure.manifest);
                }
            }
            error!(
                stage = %failure.stage,
                step = %failure.step,
                kind = failure.error.kind(),
                error = %failure.error,
                "Deployment failed"
            );
            std::process::exit(1);
        }
    }
}

/// Last resort when no manifest file can be written.
fn dump_manifest(manifest: &DeploymentManifest) {
    match manifest.to_json() {
        Ok(json) => {
            eprint!("{}", json);
            warn!(components = manifest.len(), "Manifest dumped to stderr");
        }
        Err(e) => error!(error = %e, "Failed to serialize manifest"),
    }
}

fn dry_run() -> bool {
    std::env::var(env::DRY_RUN)
        .map(|v| !matches!(v.as_str(), "" | "0" | "false"))
        .unwrap_or(false)
}

fn log_deployment(deployment: &ResolvedDeployment) {
    info!(
        deployment = %deployment.name,
        chain = %deployment.chain.name,
        chain_id = deployment.chain.chain_id,
        gas_pricing = deployment.chain.gas.pricing.as_str(),
        gas_limit = deployment.chain.gas.gas_limit,
        artifacts = %deployment.artifacts_dir.display(),
        manifest = %deployment.manifest_path.display(),
        "Deployment configuration"
    );
    for asset in &deployment.assets {
        info!(
            index = asset.index,
            asset = %asset.name,
            kind = ?asset.kind,
            decimals = asset.decimals,
            borrow_limit = wad_to_f64(asset.borrow_limit),
            margin_call_limit = wad_to_f64(asset.margin_call_limit),
            "Asset"
        );
    }
}

fn log_plan(plan: &DeploymentPlan) {
    for stage in plan.stages() {
        info!(stage = %stage.name, steps = stage.steps.len(), "Stage");
        for step in &stage.steps {
            info!(stage = %stage.name, "  {}", step);
        }
    }
}
