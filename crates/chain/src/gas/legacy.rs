//! Single gas price, as used by Truffle-era development chains.

use super::{GasParams, GasStrategy};
use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Legacy pricing: the node's suggested gas price, capped.
#[derive(Debug, Clone)]
pub struct LegacyGasStrategy {
    /// Used when the node gives no suggestion, in wei.
    default_gas_price: u128,
    /// Ceiling, in wei.
    max_gas_price: u128,
}

impl LegacyGasStrategy {
    pub fn new(default_gas_price: u128, max_gas_price: u128) -> Self {
        Self {
            default_gas_price,
            max_gas_price,
        }
    }

    fn cap(&self, gas_price: u128) -> u128 {
        gas_price.min(self.max_gas_price)
    }
}

#[async_trait]
impl GasStrategy for LegacyGasStrategy {
    async fn fetch_params(&self, rpc_url: &str) -> Result<GasParams> {
        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);
        let suggested = provider
            .get_gas_price()
            .await
            .unwrap_or(self.default_gas_price);
        let gas_price = self.cap(suggested);

        debug!(suggested, gas_price, "Legacy gas price fetched");
        Ok(GasParams::Legacy { gas_price })
    }

    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams) {
        match params {
            GasParams::Legacy { gas_price } => tx.set_gas_price(*gas_price),
            GasParams::Eip1559 {
                max_fee_per_gas, ..
            } => tx.set_gas_price(self.cap(*max_fee_per_gas)),
        }
    }

    fn strategy_name(&self) -> &'static str {
        "Legacy"
    }
}
