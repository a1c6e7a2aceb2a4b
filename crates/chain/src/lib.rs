//! Chain interaction layer for protocol deployment.
//!
//! This crate provides:
//! - Compiled artifact loading (Truffle and Foundry JSON)
//! - Transaction signing and sequential submission
//! - Gas strategy abstraction (Legacy + EIP-1559)
//! - The `ContractDeployer` seam with its RPC implementation
//! - Contract interfaces for pre-encoded calls (handler relay, ERC20)

mod artifacts;
pub mod contracts;
mod deployer;
pub mod gas;
mod signer;

pub use artifacts::ArtifactStore;
pub use contracts::{
    decode_set_underlying_decimal, encode_set_underlying_decimal, selector_of,
    HANDLER_RELAY_SIGNATURE, SET_UNDERLYING_DECIMAL_SIGNATURE,
};
pub use deployer::{CallReceipt, ContractDeployer, Creation, RpcDeployer};
pub use gas::{GasParams, GasPolicy, GasStrategy};
pub use signer::{NonceManager, TransactionSender, TransactionSenderBuilder, DEFAULT_GAS_LIMIT};
