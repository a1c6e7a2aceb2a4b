//! In-memory deployer and sample data for tests.

use alloy::primitives::{Address, Bytes, B256, U256};
use anyhow::{bail, Result};
use async_trait::async_trait;
use deployer_chain::{selector_of, CallReceipt, ContractDeployer, Creation};
use parking_lot::Mutex;
use std::collections::HashSet;

use crate::config::{
    AssetConfig, AssetEntry, AssetKind, OracleEntry, ProtocolParams, RewardToken, TokenEntry,
};
use crate::units::WAD;

#[derive(Debug, Clone)]
pub struct RecordedCreation {
    pub artifact: String,
    pub constructor_args: Bytes,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub target: Address,
    pub calldata: Bytes,
}

#[derive(Default)]
struct MockState {
    creations: Vec<RecordedCreation>,
    calls: Vec<RecordedCall>,
    nonce: u64,
    fail_create: HashSet<String>,
    withhold: HashSet<String>,
    fail_calls: Vec<(Address, [u8; 4])>,
    fail_calls_on: Vec<(String, [u8; 4])>,
}

/// Assigns sequential addresses and records everything it is asked to do.
#[derive(Default)]
pub struct MockDeployer {
    state: Mutex<MockState>,
}

impl MockDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make creations of `artifact` revert.
    pub fn fail_create(&self, artifact: &str) {
        self.state.lock().fail_create.insert(artifact.to_string());
    }

    /// Make creations of `artifact` confirm without a contract address.
    pub fn withhold_address(&self, artifact: &str) {
        self.state.lock().withhold.insert(artifact.to_string());
    }

    /// Make calls of `signature` on `target` revert.
    pub fn fail_call(&self, target: Address, signature: &str) {
        self.state
            .lock()
            .fail_calls
            .push((target, selector_of(signature)));
    }

    /// Make calls of `signature` on whatever `artifact` deploys to revert.
    pub fn fail_call_on(&self, artifact: &str, signature: &str) {
        self.state
            .lock()
            .fail_calls_on
            .push((artifact.to_string(), selector_of(signature)));
    }

    pub fn creations(&self) -> Vec<RecordedCreation> {
        self.state.lock().creations.clone()
    }

    pub fn creation(&self, artifact: &str) -> Option<RecordedCreation> {
        self.state
            .lock()
            .creations
            .iter()
            .find(|c| c.artifact == artifact)
            .cloned()
    }

    /// Confirmed calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Confirmed calls whose selector matches `signature`.
    pub fn calls_to(&self, signature: &str) -> Vec<RecordedCall> {
        let selector = selector_of(signature);
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.calldata.get(..4) == Some(&selector[..]))
            .cloned()
            .collect()
    }
}

fn mock_address(n: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(0x1000 + n).to_be_bytes());
    Address::from(bytes)
}

fn mock_hash(n: u64) -> B256 {
    B256::from(U256::from(n))
}

#[async_trait]
impl ContractDeployer for MockDeployer {
    async fn create(&self, artifact: &str, constructor_args: Bytes) -> Result<Creation> {
        let mut state = self.state.lock();
        state.nonce += 1;
        let n = state.nonce;

        if state.fail_create.contains(artifact) {
            bail!("execution reverted");
        }
        if state.withhold.contains(artifact) {
            return Ok(Creation {
                address: None,
                tx_hash: mock_hash(n),
            });
        }

        let address = mock_address(n);
        state.creations.push(RecordedCreation {
            artifact: artifact.to_string(),
            constructor_args,
            address,
        });
        Ok(Creation {
            address: Some(address),
            tx_hash: mock_hash(n),
        })
    }

    async fn call(&self, target: Address, calldata: Bytes) -> Result<CallReceipt> {
        let mut state = self.state.lock();
        state.nonce += 1;
        let n = state.nonce;

        let selector: [u8; 4] = match calldata.get(..4).and_then(|s| s.try_into().ok()) {
            Some(selector) => selector,
            None => bail!("calldata too short"),
        };

        let failing = state.fail_calls.contains(&(target, selector))
            || state.fail_calls_on.iter().any(|(artifact, s)| {
                *s == selector
                    && state
                        .creations
                        .iter()
                        .any(|c| &c.artifact == artifact && c.address == target)
            });
        if failing {
            bail!("execution reverted");
        }

        state.calls.push(RecordedCall { target, calldata });
        Ok(CallReceipt {
            tx_hash: mock_hash(n),
        })
    }
}

fn entry(
    name: &str,
    decimals: u8,
    ratios: [&str; 4],
    oracle: (&str, &str),
    token: Option<(&str, &str)>,
) -> AssetEntry {
    AssetEntry {
        name: name.to_string(),
        kind: if token.is_some() {
            AssetKind::Token
        } else {
            AssetKind::Native
        },
        decimals,
        borrow_limit: ratios[0].to_string(),
        margin_call_limit: ratios[1].to_string(),
        minimum_interest_rate: ratios[2].to_string(),
        liquidity_sensitive: ratios[3].to_string(),
        limit_of_action: "100000".to_string(),
        liquidity_limit: "1".to_string(),
        oracle: OracleEntry {
            name: oracle.0.to_string(),
            price: oracle.1.to_string(),
        },
        token: token.map(|(label, symbol)| TokenEntry {
            name: name.to_string(),
            label: label.to_string(),
            symbol: symbol.to_string(),
        }),
        si_engine: None,
        si_storage: None,
    }
}

/// Coin (native), Usdt (6 decimals), Dai and Link.
pub fn sample_assets() -> Vec<AssetConfig> {
    let entries = [
        entry(
            "Coin",
            18,
            ["0.8", "0.93", "0.02", "0.1"],
            ("EtherOracle", "100000000"),
            None,
        ),
        entry(
            "Usdt",
            6,
            ["0.5", "0.93", "0", "0.04"],
            ("UsdtOracle", "1000000000000000000"),
            Some(("usdt", "USDT")),
        ),
        entry(
            "Dai",
            18,
            ["0.75", "0.93", "0", "0.05"],
            ("DaiOracle", "100000000"),
            Some(("dai", "DAI")),
        ),
        entry(
            "Link",
            18,
            ["0.6", "0.90", "0.02", "0.1"],
            ("LinkOracle", "100000000"),
            Some(("link", "LINK")),
        ),
    ];
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| e.resolve(i as u64).unwrap())
        .collect()
}

pub fn sample_protocol() -> ProtocolParams {
    ProtocolParams {
        manager_label: "ether".to_string(),
        manager_external: "0x6d3A0d57Aa65fe133802c48F659521F7693fa477"
            .parse()
            .unwrap(),
        reward_token: RewardToken {
            name: "Bifi".to_string(),
            label: "bifi".to_string(),
            symbol: "BIFI".to_string(),
            decimals: 18,
        },
        treasury_transfer: U256::from(1_000_000_000u64) * WAD,
        oracle_proxy: "OracleProxy".to_string(),
        call_proxy: "callProxy".to_string(),
    }
}
