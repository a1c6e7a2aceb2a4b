//! Transaction signing and submission for deployments.
//!
//! Every creation and wiring call goes through [`TransactionSender::submit`],
//! which signs with the deployer key, prices the transaction with the
//! configured [`GasStrategy`], and blocks until a receipt arrives. Submission
//! is strictly sequential, so the nonce is tracked locally and only resynced
//! from the chain after a failure.

use crate::gas::{create_gas_strategy, GasPolicy, GasStrategy};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Locally tracked account nonce.
#[derive(Debug)]
pub struct NonceManager {
    current: AtomicU64,
}

impl NonceManager {
    pub fn new(initial_nonce: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_nonce),
        }
    }

    /// Take the next nonce.
    #[inline]
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst)
    }

    /// Nonce the next transaction will use.
    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Replace the local value with the chain's.
    pub fn reset(&self, chain_nonce: u64) {
        self.current.store(chain_nonce, Ordering::SeqCst);
    }
}

/// Gas limit used when the chain config does not set one. Matches the
/// block gas limit of a default Ganache development chain.
pub const DEFAULT_GAS_LIMIT: u64 = 12_000_000;

/// Builder for [`TransactionSender`].
pub struct TransactionSenderBuilder {
    rpc_url: String,
    chain_id: u64,
    gas_policy: Option<GasPolicy>,
    gas_limit: Option<u64>,
    receipt_timeout: Option<Duration>,
}

impl TransactionSenderBuilder {
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            gas_policy: None,
            gas_limit: None,
            receipt_timeout: None,
        }
    }

    pub fn gas_policy(mut self, policy: GasPolicy) -> Self {
        self.gas_policy = Some(policy);
        self
    }

    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// Give up on a receipt after `timeout`. Without one, submission waits
    /// indefinitely.
    pub fn receipt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Connect, verify the chain id, and fetch the starting nonce.
    pub async fn build(self, private_key: &str) -> Result<TransactionSender> {
        let key_str = private_key.trim_start_matches("0x");
        let signer: PrivateKeySigner = key_str.parse().context("Invalid deployer private key")?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let remote_chain_id = provider
            .get_chain_id()
            .await
            .with_context(|| format!("Failed to reach RPC endpoint {}", self.rpc_url))?;
        if remote_chain_id != self.chain_id {
            anyhow::bail!(
                "Chain id mismatch: configured {}, endpoint reports {}",
                self.chain_id,
                remote_chain_id
            );
        }

        let initial_nonce = provider.get_transaction_count(address).await?;
        let gas_strategy =
            create_gas_strategy(&self.gas_policy.unwrap_or_else(|| GasPolicy::legacy(1.0, 10.0)));

        info!(
            address = %address,
            chain_id = self.chain_id,
            initial_nonce,
            gas_strategy = gas_strategy.strategy_name(),
            "Transaction sender initialized"
        );

        Ok(TransactionSender {
            rpc_url: self.rpc_url,
            wallet,
            address,
            chain_id: self.chain_id,
            nonce_manager: NonceManager::new(initial_nonce),
            gas_limit: self.gas_limit.unwrap_or(DEFAULT_GAS_LIMIT),
            gas_strategy,
            receipt_timeout: self.receipt_timeout,
        })
    }
}

/// Signs and submits deployment transactions one at a time.
pub struct TransactionSender {
    rpc_url: String,
    wallet: EthereumWallet,
    /// Deployer account
    pub address: Address,
    chain_id: u64,
    nonce_manager: NonceManager,
    gas_limit: u64,
    gas_strategy: Box<dyn GasStrategy>,
    receipt_timeout: Option<Duration>,
}

impl TransactionSender {
    /// Sender with legacy pricing and default limits.
    pub async fn new(private_key: &str, rpc_url: &str, chain_id: u64) -> Result<Self> {
        TransactionSenderBuilder::new(rpc_url, chain_id)
            .build(private_key)
            .await
    }

    /// Sign, submit, and wait for the receipt of `tx`.
    ///
    /// `tx` carries only the payload (`to`/`input` or deploy code); nonce,
    /// gas and chain id are filled in here. A reverted transaction is an
    /// error.
    pub async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt> {
        let start = Instant::now();
        let nonce = self.nonce_manager.next();
        let gas_params = self.gas_strategy.fetch_params(&self.rpc_url).await?;

        let mut tx = tx
            .with_nonce(nonce)
            .with_gas_limit(self.gas_limit)
            .with_chain_id(self.chain_id)
            .with_value(U256::ZERO);
        self.gas_strategy.apply_gas(&mut tx, &gas_params);

        debug!(
            nonce,
            gas_limit = self.gas_limit,
            gas_price = gas_params.effective_gas_price(),
            "Submitting transaction"
        );

        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.parse()?);

        let pending = match provider.send_transaction(tx).await {
            Ok(pending) => pending,
            Err(e) => {
                self.sync_nonce().await;
                return Err(e).context("Node rejected transaction");
            }
        };
        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, "Transaction submitted, waiting for receipt");

        let receipt = match self.receipt_timeout {
            Some(timeout) => tokio::time::timeout(timeout, pending.get_receipt())
                .await
                .map_err(|_| {
                    anyhow::anyhow!(
                        "No receipt for {} within {}s",
                        tx_hash,
                        timeout.as_secs()
                    )
                })??,
            None => pending.get_receipt().await?,
        };

        if !receipt.status() {
            warn!(tx_hash = %tx_hash, "Transaction reverted, syncing nonce");
            self.sync_nonce().await;
            anyhow::bail!("Transaction reverted: {}", tx_hash);
        }

        info!(
            tx_hash = %tx_hash,
            block = receipt.block_number.unwrap_or(0),
            gas_used = receipt.gas_used,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Transaction confirmed"
        );
        Ok(receipt)
    }

    /// Resync the local nonce from the chain.
    pub async fn sync_nonce(&self) {
        let url = match self.rpc_url.parse() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Invalid RPC URL, nonce not synced");
                return;
            }
        };
        let provider = ProviderBuilder::new().on_http(url);
        match provider.get_transaction_count(self.address).await {
            Ok(chain_nonce) => {
                self.nonce_manager.reset(chain_nonce);
                debug!(nonce = chain_nonce, "Nonce synced from chain");
            }
            Err(e) => warn!(error = %e, "Failed to sync nonce from chain"),
        }
    }

    /// Nonce the next submission will use.
    pub fn current_nonce(&self) -> u64 {
        self.nonce_manager.current()
    }

    /// Deployer balance, for the startup log.
    pub async fn balance(&self) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        Ok(provider.get_balance(self.address).await?)
    }

    pub fn gas_strategy_name(&self) -> &'static str {
        self.gas_strategy.strategy_name()
    }
}

impl std::fmt::Debug for TransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSender")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url)
            .field("gas_strategy", &self.gas_strategy.strategy_name())
            .finish_non_exhaustive()
    }
}
