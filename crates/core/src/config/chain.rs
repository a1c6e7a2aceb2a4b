//! Chain configuration: endpoint, chain id, and fee policy.

use deployer_chain::GasPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Chain configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain details
    pub chain: ChainDetails,
}

/// Chain details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDetails {
    /// Chain ID the endpoint must report
    pub chain_id: u64,
    /// Human-readable name
    pub name: String,
    /// Native token symbol (e.g., "ETH")
    pub native_token: String,
    /// Explorer URL for transaction links
    #[serde(default)]
    pub explorer_url: Option<String>,
    /// RPC configuration
    pub rpc: RpcConfig,
    /// Gas configuration
    pub gas: GasConfig,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP RPC endpoint; `${VAR}` placeholders are expanded
    pub http: String,
}

/// Gas and confirmation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas pricing model
    pub pricing: GasPricingModel,
    /// Gas limit attached to every transaction
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Gas price used when the node gives no suggestion (in gwei)
    #[serde(default = "default_gas_price")]
    pub default_gas_price_gwei: f64,
    /// Maximum gas price willing to pay (in gwei)
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price_gwei: f64,
    /// Priority fee for EIP-1559 transactions (in gwei)
    #[serde(default)]
    pub priority_fee_gwei: Option<f64>,
    /// Give up waiting for a receipt after this many seconds; unset waits
    /// indefinitely
    #[serde(default)]
    pub receipt_timeout_secs: Option<u64>,
}

fn default_gas_limit() -> u64 {
    deployer_chain::DEFAULT_GAS_LIMIT
}

fn default_gas_price() -> f64 {
    1.0
}

fn default_max_gas_price() -> f64 {
    100.0
}

/// Gas pricing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasPricingModel {
    /// Single gas price
    Legacy,
    /// Base fee + priority fee
    Eip1559,
}

impl GasPricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GasPricingModel::Legacy => "Legacy",
            GasPricingModel::Eip1559 => "Eip1559",
        }
    }
}

impl GasConfig {
    /// Fee policy for the chain layer.
    pub fn policy(&self) -> GasPolicy {
        GasPolicy {
            pricing: self.pricing.as_str().to_string(),
            default_gas_price_gwei: self.default_gas_price_gwei,
            max_gas_price_gwei: self.max_gas_price_gwei,
            priority_fee_gwei: self.priority_fee_gwei,
        }
    }

    pub fn receipt_timeout(&self) -> Option<Duration> {
        self.receipt_timeout_secs.map(Duration::from_secs)
    }
}

impl ChainConfig {
    /// Load chain config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ChainConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Expand environment variables in config values.
    pub fn expand_env_vars(&mut self) {
        self.chain.rpc.http = expand_env(&self.chain.rpc.http);
    }
}

/// Expand ${VAR_NAME} patterns with environment variable values. Unset
/// variables are left in place so the failure surfaces at connect time with
/// the placeholder visible.
pub(crate) fn expand_env(s: &str) -> String {
    let mut result = s.to_string();
    let re = match regex_lite::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return result,
    };

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env() {
        std::env::set_var("DEPLOYER_CHAIN_TEST_VAR", "key123");
        assert_eq!(expand_env("${DEPLOYER_CHAIN_TEST_VAR}"), "key123");
        assert_eq!(
            expand_env("https://goerli.infura.io/v3/${DEPLOYER_CHAIN_TEST_VAR}"),
            "https://goerli.infura.io/v3/key123"
        );
        assert_eq!(expand_env("http://127.0.0.1:8545"), "http://127.0.0.1:8545");
        assert_eq!(
            expand_env("${DEPLOYER_CHAIN_UNSET_VAR}"),
            "${DEPLOYER_CHAIN_UNSET_VAR}"
        );
        std::env::remove_var("DEPLOYER_CHAIN_TEST_VAR");
    }

    #[test]
    fn test_parse_chain_config() {
        let toml_str = r#"
            [chain]
            chain_id = 1337
            name = "development"
            native_token = "ETH"

            [chain.rpc]
            http = "http://127.0.0.1:8545"

            [chain.gas]
            pricing = "Legacy"
            gas_limit = 12000000
            default_gas_price_gwei = 1.0
        "#;

        let config: ChainConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chain.chain_id, 1337);
        assert_eq!(config.chain.gas.gas_limit, 12_000_000);
        assert_eq!(config.chain.gas.max_gas_price_gwei, 100.0);
        assert!(config.chain.gas.receipt_timeout().is_none());

        let policy = config.chain.gas.policy();
        assert_eq!(policy.pricing, "Legacy");
        assert_eq!(policy.default_gas_price_gwei, 1.0);
    }
}
