//! Post-creation wiring calls.
//!
//! A [`WiringCall`] names its target component, a human-readable method
//! signature and its arguments. Encoding resolves references against the
//! manifest and produces `selector ++ abi(params)`; the [`WiringExecutor`]
//! submits the result through a [`ContractDeployer`] and waits for it.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, Bytes};
use deployer_chain::{selector_of, CallReceipt, ContractDeployer};
use std::fmt;
use tracing::{debug, info};

use crate::descriptor::{resolve_args, ArgSpec};
use crate::error::DeployError;
use crate::manifest::DeploymentManifest;

/// Parsed method signature such as `handlerRegister(uint256,address)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    name: String,
    params: Vec<DynSolType>,
    canonical: String,
}

impl MethodSignature {
    pub fn parse(signature: &str) -> Result<Self, String> {
        let signature = signature.trim();
        let open = signature
            .find('(')
            .ok_or_else(|| format!("{} has no parameter list", signature))?;
        if !signature.ends_with(')') {
            return Err(format!("{} is not closed", signature));
        }

        let name = &signature[..open];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("{} is not a valid method name", name));
        }

        let inner = signature[open + 1..signature.len() - 1].trim();
        let params = if inner.is_empty() {
            Vec::new()
        } else {
            match DynSolType::parse(&format!("({})", inner)) {
                Ok(DynSolType::Tuple(params)) => params,
                Ok(other) => vec![other],
                Err(e) => return Err(format!("{}: {}", signature, e)),
            }
        };

        let canonical = format!(
            "{}({})",
            name,
            params
                .iter()
                .map(|p| p.sol_type_name().into_owned())
                .collect::<Vec<_>>()
                .join(",")
        );

        Ok(Self {
            name: name.to_string(),
            params,
            canonical,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[DynSolType] {
        &self.params
    }

    /// Signature with canonical type names, the selector preimage.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn selector(&self) -> [u8; 4] {
        selector_of(&self.canonical)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// A call on a deployed component.
#[derive(Debug, Clone)]
pub struct WiringCall {
    /// Component the call is sent to
    pub target: String,
    pub signature: MethodSignature,
    pub args: Vec<ArgSpec>,
}

impl WiringCall {
    /// Build a call, rejecting signatures that do not parse or arguments
    /// that do not fit them.
    pub fn new(
        target: impl Into<String>,
        signature: &str,
        args: Vec<ArgSpec>,
    ) -> Result<Self, DeployError> {
        let target = target.into();
        let parsed = MethodSignature::parse(signature).map_err(|reason| {
            DeployError::InvalidCall {
                call: format!("{}.{}", target, signature),
                reason,
            }
        })?;
        let call = Self {
            target,
            signature: parsed,
            args,
        };
        call.check()?;
        Ok(call)
    }

    /// `Target.method` for logs and errors.
    pub fn label(&self) -> String {
        format!("{}.{}", self.target, self.signature.name())
    }

    /// Component names this call needs in the manifest, target first.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.target.as_str())
            .chain(self.args.iter().filter_map(ArgSpec::referenced))
    }

    /// Arguments agree with the signature: same arity, literals of the
    /// declared type, references only where an address is expected.
    pub fn check(&self) -> Result<(), DeployError> {
        let invalid = |reason: String| DeployError::InvalidCall {
            call: self.label(),
            reason,
        };

        let params = self.signature.params();
        if params.len() != self.args.len() {
            return Err(invalid(format!(
                "{} takes {} arguments, got {}",
                self.signature,
                params.len(),
                self.args.len()
            )));
        }

        for (position, (param, arg)) in params.iter().zip(&self.args).enumerate() {
            match arg {
                ArgSpec::Literal(value) if !param.matches(value) => {
                    return Err(invalid(format!(
                        "argument {} is not a {}",
                        position,
                        param.sol_type_name()
                    )));
                }
                ArgSpec::Ref(name) if *param != DynSolType::Address => {
                    return Err(invalid(format!(
                        "argument {} references {} but expects {}",
                        position,
                        name,
                        param.sol_type_name()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve the target and arguments, then encode the calldata.
    pub fn encode(&self, manifest: &DeploymentManifest) -> Result<(Address, Bytes), DeployError> {
        let label = self.label();
        let target = manifest
            .get(&self.target)
            .ok_or_else(|| DeployError::ReferenceNotReady {
                requester: label.clone(),
                reference: self.target.clone(),
            })?;
        let values = resolve_args(&label, &self.args, manifest)?;

        let mut calldata = self.signature.selector().to_vec();
        if !values.is_empty() {
            calldata.extend(DynSolValue::Tuple(values).abi_encode_params());
        }

        debug!(
            call = %label,
            selector = %hex::encode(self.signature.selector()),
            calldata_len = calldata.len(),
            "Encoded wiring call"
        );

        Ok((target, calldata.into()))
    }
}

impl fmt::Display for WiringCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.signature)
    }
}

/// Sends wiring calls one at a time, each confirmed before the next.
pub struct WiringExecutor<'a> {
    deployer: &'a dyn ContractDeployer,
}

impl<'a> WiringExecutor<'a> {
    pub fn new(deployer: &'a dyn ContractDeployer) -> Self {
        Self { deployer }
    }

    pub async fn execute(
        &self,
        call: &WiringCall,
        manifest: &DeploymentManifest,
    ) -> Result<CallReceipt, DeployError> {
        let (target, calldata) = call.encode(manifest)?;

        let receipt = self
            .deployer
            .call(target, calldata)
            .await
            .map_err(|e| DeployError::Call {
                call: call.label(),
                reason: format!("{:#}", e),
            })?;

        info!(
            call = %call.label(),
            target = %target,
            tx_hash = %receipt.tx_hash,
            "Wiring call confirmed"
        );
        Ok(receipt)
    }

    /// Execute `calls` in order, stopping at the first failure.
    pub async fn execute_all(
        &self,
        calls: &[WiringCall],
        manifest: &DeploymentManifest,
    ) -> Result<Vec<CallReceipt>, DeployError> {
        let mut receipts = Vec::with_capacity(calls.len());
        for call in calls {
            receipts.push(self.execute(call, manifest).await?);
        }
        Ok(receipts)
    }
}
