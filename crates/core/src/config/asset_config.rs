//! Asset table: per-asset risk and token parameters.
//!
//! The TOML form ([`AssetEntry`]) keeps numbers as decimal strings. Loading
//! turns each entry into a validated [`AssetConfig`] whose ratios are WAD
//! values and whose index is its position in the file. Reordering the file
//! changes protocol-visible indices.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::DeployError;
use crate::units::{parse_integer, parse_wad, wad_to_f64, WAD};

/// Largest decimal precision a handler accepts.
pub const MAX_DECIMALS: u8 = 18;

/// Asset table file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Assets in index order
    pub assets: Vec<AssetEntry>,
}

/// Native coin or ERC20 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Native,
    Token,
}

/// Individual asset as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Component name prefix (e.g., "Coin", "Usdt")
    pub name: String,
    /// Native coin or ERC20 token
    pub kind: AssetKind,
    /// Decimal precision of the underlying
    pub decimals: u8,
    /// Collateral ratio usable for borrowing (e.g., "0.8")
    pub borrow_limit: String,
    /// Ratio at which a position is margin-called (e.g., "0.93")
    pub margin_call_limit: String,
    /// Interest rate floor (e.g., "0.02")
    pub minimum_interest_rate: String,
    /// Rate sensitivity to pool liquidity (e.g., "0.1")
    pub liquidity_sensitive: String,
    /// Per-action cap, in whole units (e.g., "100000")
    pub limit_of_action: String,
    /// Liquidity cap ratio (e.g., "1")
    pub liquidity_limit: String,
    /// Price oracle for this asset
    pub oracle: OracleEntry,
    /// Underlying token (token assets only)
    #[serde(default)]
    pub token: Option<TokenEntry>,
    /// Interest engine component name; defaults to `<name in lowercase>SI`
    #[serde(default)]
    pub si_engine: Option<String>,
    /// Interest engine storage component name; defaults to
    /// `<name>SIDataStorage`
    #[serde(default)]
    pub si_storage: Option<String>,
}

/// Oracle component and its constructor price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleEntry {
    /// Component name (e.g., "EtherOracle")
    pub name: String,
    /// Initial price, as an unscaled integer string
    pub price: String,
}

/// ERC20 token component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Component name (e.g., "Usdt")
    pub name: String,
    /// Token name passed to the constructor and the handler (e.g., "usdt")
    pub label: String,
    /// Ticker (e.g., "USDT")
    pub symbol: String,
}

/// Validated asset parameters. Ratios and limits are WAD values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetConfig {
    /// Protocol-wide handler index (declaration position)
    pub index: u64,
    pub name: String,
    pub kind: AssetKind,
    pub decimals: u8,
    pub borrow_limit: U256,
    pub margin_call_limit: U256,
    pub minimum_interest_rate: U256,
    pub liquidity_sensitive: U256,
    pub limit_of_action: U256,
    pub liquidity_limit: U256,
    /// Oracle component name
    pub oracle: String,
    /// Oracle constructor price
    pub oracle_price: U256,
    pub token: Option<TokenEntry>,
    /// Interest engine component name
    pub si_engine: String,
    /// Interest engine storage component name
    pub si_storage: String,
}

impl AssetEntry {
    /// Parse and validate into an [`AssetConfig`] at `index`.
    pub fn resolve(&self, index: u64) -> Result<AssetConfig, DeployError> {
        let subject = format!("asset {} ({})", index, self.name);
        let wad = |field: &str, value: &str| {
            parse_wad(value).map_err(|e| DeployError::config(&subject, format!("{}: {}", field, e)))
        };

        let config = AssetConfig {
            index,
            name: self.name.clone(),
            kind: self.kind,
            decimals: self.decimals,
            borrow_limit: wad("borrow_limit", &self.borrow_limit)?,
            margin_call_limit: wad("margin_call_limit", &self.margin_call_limit)?,
            minimum_interest_rate: wad("minimum_interest_rate", &self.minimum_interest_rate)?,
            liquidity_sensitive: wad("liquidity_sensitive", &self.liquidity_sensitive)?,
            limit_of_action: wad("limit_of_action", &self.limit_of_action)?,
            liquidity_limit: wad("liquidity_limit", &self.liquidity_limit)?,
            oracle: self.oracle.name.clone(),
            oracle_price: parse_integer(&self.oracle.price)
                .map_err(|e| DeployError::config(&subject, format!("oracle.price: {}", e)))?,
            token: self.token.clone(),
            si_engine: self
                .si_engine
                .clone()
                .unwrap_or_else(|| format!("{}SI", self.name.to_lowercase())),
            si_storage: self
                .si_storage
                .clone()
                .unwrap_or_else(|| format!("{}SIDataStorage", self.name)),
        };
        config.validate()?;
        Ok(config)
    }
}

impl AssetConfig {
    /// Enforce the risk-parameter ranges:
    /// borrow limit in (0, 1], margin-call limit in (borrow limit, 1],
    /// decimals in [0, 18], and token data present exactly for token assets.
    /// Minimum interest rate is non-negative by construction.
    pub fn validate(&self) -> Result<(), DeployError> {
        let subject = format!("asset {} ({})", self.index, self.name);
        let fail = |reason: String| Err(DeployError::config(&subject, reason));

        if self.name.trim().is_empty() {
            return fail("name is empty".to_string());
        }
        if self.borrow_limit.is_zero() || self.borrow_limit > WAD {
            return fail(format!(
                "borrow_limit {} is outside (0, 1]",
                wad_to_f64(self.borrow_limit)
            ));
        }
        if self.margin_call_limit <= self.borrow_limit || self.margin_call_limit > WAD {
            return fail(format!(
                "margin_call_limit {} is outside (borrow_limit {}, 1]",
                wad_to_f64(self.margin_call_limit),
                wad_to_f64(self.borrow_limit)
            ));
        }
        if self.decimals > MAX_DECIMALS {
            return fail(format!(
                "decimals {} exceeds {}",
                self.decimals, MAX_DECIMALS
            ));
        }
        match (self.kind, &self.token) {
            (AssetKind::Token, None) => fail("token asset has no [token] section".to_string()),
            (AssetKind::Native, Some(_)) => {
                fail("native asset must not declare a token".to_string())
            }
            _ => Ok(()),
        }
    }

    pub fn is_native(&self) -> bool {
        self.kind == AssetKind::Native
    }

    /// Handler data storage component name.
    pub fn data_storage_name(&self) -> String {
        format!("{}HandlerDataStorage", self.name)
    }

    /// Handler proxy component name.
    pub fn proxy_name(&self) -> String {
        format!("{}HandlerProxy", self.name)
    }

    /// Simple-interest data storage component name.
    pub fn si_storage_name(&self) -> String {
        self.si_storage.clone()
    }

    /// Handler logic component name.
    pub fn logic_name(&self) -> String {
        format!("{}HandlerLogic", self.name)
    }
}

impl AssetsConfig {
    /// Load the asset table from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AssetsConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve every entry, assigning indices by position, and check
    /// table-wide rules: at least one asset, unique names, at most one
    /// native asset.
    pub fn resolve(&self) -> Result<Vec<AssetConfig>, DeployError> {
        if self.assets.is_empty() {
            return Err(DeployError::config("asset table", "no assets declared"));
        }

        let mut names = HashSet::new();
        let mut native = None;
        let mut resolved = Vec::with_capacity(self.assets.len());

        for (position, entry) in self.assets.iter().enumerate() {
            let asset = entry.resolve(position as u64)?;
            if !names.insert(asset.name.clone()) {
                return Err(DeployError::config(
                    "asset table",
                    format!("asset name {} is declared twice", asset.name),
                ));
            }
            if asset.is_native() {
                if let Some(first) = native.replace(asset.name.clone()) {
                    return Err(DeployError::config(
                        "asset table",
                        format!("both {} and {} are native", first, asset.name),
                    ));
                }
            }
            resolved.push(asset);
        }

        Ok(resolved)
    }
}
