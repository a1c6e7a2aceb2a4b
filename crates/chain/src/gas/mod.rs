//! Fee policies for deployment transactions.
//!
//! Creations and wiring calls share one fee policy, selected from the chain
//! configuration. Development chains (Ganache, Anvil in legacy mode) price
//! with a single gas price; public networks use EIP-1559.
//!
//! # Example
//!
//! ```rust,ignore
//! use deployer_chain::gas::{create_gas_strategy, GasPolicy};
//!
//! let strategy = create_gas_strategy(&GasPolicy::legacy(1.0, 10.0));
//! let params = strategy.fetch_params("http://127.0.0.1:8545").await?;
//! ```

mod eip1559;
mod legacy;

pub use eip1559::Eip1559GasStrategy;
pub use legacy::LegacyGasStrategy;

use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// One gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Gas parameters fetched from the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasParams {
    /// Single gas price.
    Legacy {
        /// Gas price in wei.
        gas_price: u128,
    },
    /// Base fee plus tip.
    Eip1559 {
        /// Maximum fee per gas in wei.
        max_fee_per_gas: u128,
        /// Maximum priority fee per gas in wei.
        max_priority_fee_per_gas: u128,
    },
}

impl GasParams {
    /// Upper bound on what one unit of gas can cost.
    pub fn effective_gas_price(&self) -> u128 {
        match self {
            GasParams::Legacy { gas_price } => *gas_price,
            GasParams::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// Fee policy values as they appear in chain configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GasPolicy {
    /// "Legacy" or "Eip1559" (case-insensitive).
    pub pricing: String,
    /// Gas price used when the node gives no suggestion, in gwei.
    pub default_gas_price_gwei: f64,
    /// Ceiling on the price paid per gas, in gwei.
    pub max_gas_price_gwei: f64,
    /// Tip for EIP-1559 transactions, in gwei.
    pub priority_fee_gwei: Option<f64>,
}

impl GasPolicy {
    /// Legacy pricing with the given default and ceiling.
    pub fn legacy(default_gas_price_gwei: f64, max_gas_price_gwei: f64) -> Self {
        Self {
            pricing: "Legacy".to_string(),
            default_gas_price_gwei,
            max_gas_price_gwei,
            priority_fee_gwei: None,
        }
    }
}

/// Strategy for pricing deployment transactions.
#[async_trait]
pub trait GasStrategy: Send + Sync + Debug {
    /// Query the node behind `rpc_url` for current prices.
    async fn fetch_params(&self, rpc_url: &str) -> Result<GasParams>;

    /// Write the pricing fields into a transaction request.
    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams);

    /// Name for logs.
    fn strategy_name(&self) -> &'static str;
}

/// Build the strategy named by `policy.pricing`. Unknown names fall back to
/// legacy pricing.
pub fn create_gas_strategy(policy: &GasPolicy) -> Box<dyn GasStrategy> {
    let max_fee = gwei_to_wei(policy.max_gas_price_gwei);
    match policy.pricing.to_lowercase().as_str() {
        "eip1559" | "eip-1559" => {
            let priority_fee = gwei_to_wei(policy.priority_fee_gwei.unwrap_or(2.0));
            Box::new(Eip1559GasStrategy::new(priority_fee, max_fee))
        }
        _ => Box::new(LegacyGasStrategy::new(
            gwei_to_wei(policy.default_gas_price_gwei),
            max_fee,
        )),
    }
}

fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei * GWEI as f64) as u128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_gas_price() {
        let legacy = GasParams::Legacy { gas_price: GWEI };
        assert_eq!(legacy.effective_gas_price(), GWEI);

        let eip1559 = GasParams::Eip1559 {
            max_fee_per_gas: 50 * GWEI,
            max_priority_fee_per_gas: 2 * GWEI,
        };
        assert_eq!(eip1559.effective_gas_price(), 50 * GWEI);
    }

    #[test]
    fn test_create_gas_strategy() {
        let legacy = create_gas_strategy(&GasPolicy::legacy(1.0, 10.0));
        assert_eq!(legacy.strategy_name(), "Legacy");

        let eip1559 = create_gas_strategy(&GasPolicy {
            pricing: "Eip1559".to_string(),
            default_gas_price_gwei: 30.0,
            max_gas_price_gwei: 500.0,
            priority_fee_gwei: Some(2.0),
        });
        assert_eq!(eip1559.strategy_name(), "EIP-1559");

        let unknown = create_gas_strategy(&GasPolicy {
            pricing: "Custom".to_string(),
            ..GasPolicy::legacy(1.0, 10.0)
        });
        assert_eq!(unknown.strategy_name(), "Legacy");
    }

    #[test]
    fn test_gwei_conversion() {
        assert_eq!(gwei_to_wei(1.0), GWEI);
        assert_eq!(gwei_to_wei(0.5), GWEI / 2);
    }
}
