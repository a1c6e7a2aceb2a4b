//! Contract interfaces the deployer encodes calls against.
//!
//! Most wiring calls are described by signature strings in the deployment
//! plan and encoded dynamically. The handful declared here are the ones whose
//! calldata is built ahead of time: the payload relayed through a handler
//! proxy, and the relay entry point itself.

use alloy::primitives::{keccak256, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// Handler proxy: forwards opaque calldata to its logic contract.
    #[sol(rpc)]
    interface IHandlerProxy {
        function handlerViewProxy(bytes memory data) external returns (bool, bytes memory);
    }

    /// Handler logic entry points reached through the proxy relay.
    interface IHandlerLogic {
        function setUnderlyingTokenDecimal(uint256 _underlyingTokenDecimal) external returns (bool);
    }

    /// ERC20 subset used for treasury funding.
    #[sol(rpc)]
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Canonical signature of the proxy relay entry point.
pub const HANDLER_RELAY_SIGNATURE: &str = IHandlerProxy::handlerViewProxyCall::SIGNATURE;

/// Canonical signature of the decimal-setting call carried by the relay.
pub const SET_UNDERLYING_DECIMAL_SIGNATURE: &str =
    IHandlerLogic::setUnderlyingTokenDecimalCall::SIGNATURE;

/// First four bytes of keccak-256 over a canonical method signature.
pub fn selector_of(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Payload for `setUnderlyingTokenDecimal(decimals)`, ready to be relayed.
pub fn encode_set_underlying_decimal(decimals: u8) -> Bytes {
    let call = IHandlerLogic::setUnderlyingTokenDecimalCall {
        _underlyingTokenDecimal: U256::from(decimals),
    };
    Bytes::from(call.abi_encode())
}

/// Recover the decimals value from a relayed payload.
pub fn decode_set_underlying_decimal(payload: &[u8]) -> anyhow::Result<U256> {
    let call = IHandlerLogic::setUnderlyingTokenDecimalCall::abi_decode(payload, true)
        .map_err(|e| anyhow::anyhow!("Not a setUnderlyingTokenDecimal payload: {}", e))?;
    Ok(call._underlyingTokenDecimal)
}
