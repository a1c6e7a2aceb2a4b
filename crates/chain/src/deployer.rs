//! Creation and call interfaces the orchestrator drives.
//!
//! [`ContractDeployer`] is the seam between the deployment plan and the
//! network: the plan resolves names and encodes arguments, the deployer
//! turns them into confirmed transactions. [`RpcDeployer`] is the network
//! implementation; tests substitute an in-memory one.

use crate::artifacts::ArtifactStore;
use crate::signer::TransactionSender;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Outcome of a confirmed creation.
///
/// `address` is `None` when the receipt carried no contract address. The
/// caller decides what that means; it is never papered over here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
    pub address: Option<Address>,
    pub tx_hash: B256,
}

/// Outcome of a confirmed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReceipt {
    pub tx_hash: B256,
}

/// Creates contracts and sends calls, one confirmed transaction at a time.
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Deploy `artifact` with ABI-encoded constructor arguments appended to
    /// its creation bytecode.
    async fn create(&self, artifact: &str, constructor_args: Bytes) -> Result<Creation>;

    /// Send `calldata` to `target`.
    async fn call(&self, target: Address, calldata: Bytes) -> Result<CallReceipt>;
}

/// Network-backed deployer.
#[derive(Debug)]
pub struct RpcDeployer {
    sender: TransactionSender,
    artifacts: ArtifactStore,
}

impl RpcDeployer {
    pub fn new(sender: TransactionSender, artifacts: ArtifactStore) -> Self {
        Self { sender, artifacts }
    }

    pub fn sender(&self) -> &TransactionSender {
        &self.sender
    }
}

#[async_trait]
impl ContractDeployer for RpcDeployer {
    async fn create(&self, artifact: &str, constructor_args: Bytes) -> Result<Creation> {
        let bytecode = self.artifacts.bytecode(artifact)?;
        let mut code = Vec::with_capacity(bytecode.len() + constructor_args.len());
        code.extend_from_slice(&bytecode);
        code.extend_from_slice(&constructor_args);

        debug!(
            artifact,
            bytecode_len = bytecode.len(),
            args_len = constructor_args.len(),
            "Creating contract"
        );

        let tx = TransactionRequest::default().with_deploy_code(Bytes::from(code));
        let receipt = self
            .sender
            .submit(tx)
            .await
            .with_context(|| format!("Creation of {} failed", artifact))?;

        info!(
            artifact,
            address = ?receipt.contract_address,
            tx_hash = %receipt.transaction_hash,
            "Contract created"
        );

        Ok(Creation {
            address: receipt.contract_address,
            tx_hash: receipt.transaction_hash,
        })
    }

    async fn call(&self, target: Address, calldata: Bytes) -> Result<CallReceipt> {
        let selector = calldata.get(..4).map(hex::encode).unwrap_or_default();
        let tx = TransactionRequest::default()
            .with_to(target)
            .with_input(calldata);
        let receipt = self
            .sender
            .submit(tx)
            .await
            .with_context(|| format!("Call 0x{} to {} failed", selector, target))?;

        Ok(CallReceipt {
            tx_hash: receipt.transaction_hash,
        })
    }
}
