//! EIP-1559 pricing for public networks.

use super::{GasParams, GasStrategy};
use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Headroom over the latest base fee so a creation survives a few rising
/// blocks without being repriced.
const BASE_FEE_MULTIPLIER: u128 = 2;

/// EIP-1559 pricing: `max_fee = 2 * base_fee + tip`, capped.
#[derive(Debug, Clone)]
pub struct Eip1559GasStrategy {
    /// Tip used when the node gives no suggestion, in wei.
    default_priority_fee: u128,
    /// Ceiling on `max_fee_per_gas`, in wei.
    max_fee_cap: u128,
}

impl Eip1559GasStrategy {
    pub fn new(default_priority_fee: u128, max_fee_cap: u128) -> Self {
        Self {
            default_priority_fee,
            max_fee_cap,
        }
    }

    fn calculate_max_fee(&self, base_fee: u128, priority_fee: u128) -> u128 {
        (base_fee * BASE_FEE_MULTIPLIER + priority_fee).min(self.max_fee_cap)
    }
}

#[async_trait]
impl GasStrategy for Eip1559GasStrategy {
    async fn fetch_params(&self, rpc_url: &str) -> Result<GasParams> {
        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);

        let block = provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Node returned no latest block"))?;
        let base_fee = block
            .header
            .base_fee_per_gas
            .map(u128::from)
            .ok_or_else(|| anyhow::anyhow!("Latest block has no base fee; use Legacy pricing"))?;

        let priority_fee = provider
            .get_max_priority_fee_per_gas()
            .await
            .unwrap_or(self.default_priority_fee);
        let max_fee_per_gas = self.calculate_max_fee(base_fee, priority_fee);

        debug!(base_fee, priority_fee, max_fee_per_gas, "EIP-1559 fees fetched");
        Ok(GasParams::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas: priority_fee.min(max_fee_per_gas),
        })
    }

    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams) {
        match params {
            GasParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                tx.set_max_fee_per_gas(*max_fee_per_gas);
                tx.set_max_priority_fee_per_gas(*max_priority_fee_per_gas);
            }
            GasParams::Legacy { gas_price } => {
                tx.set_max_fee_per_gas(*gas_price);
                tx.set_max_priority_fee_per_gas(self.default_priority_fee.min(*gas_price));
            }
        }
    }

    fn strategy_name(&self) -> &'static str {
        "EIP-1559"
    }
}
