//! Component descriptors and their constructor arguments.
//!
//! A descriptor names one deployable unit, the artifact it is built from and
//! its constructor arguments. Arguments are either literal ABI values or
//! references to another component's address, which only becomes known once
//! that component is in the manifest.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, U256};
use std::collections::HashMap;

use crate::error::DeployError;
use crate::manifest::DeploymentManifest;

/// One constructor or call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSpec {
    /// Value known at plan time
    Literal(DynSolValue),
    /// Address of another component, looked up in the manifest
    Ref(String),
}

impl ArgSpec {
    pub fn uint(value: U256) -> Self {
        Self::Literal(DynSolValue::Uint(value, 256))
    }

    pub fn uint8(value: u8) -> Self {
        Self::Literal(DynSolValue::Uint(U256::from(value), 8))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(DynSolValue::String(value.into()))
    }

    pub fn address(value: Address) -> Self {
        Self::Literal(DynSolValue::Address(value))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::Literal(DynSolValue::Bytes(value.into()))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// Component name this argument depends on, if any.
    pub fn referenced(&self) -> Option<&str> {
        match self {
            Self::Ref(name) => Some(name),
            Self::Literal(_) => None,
        }
    }
}

/// Resolve arguments against the manifest. `requester` names the component
/// or call the arguments belong to, for the error.
pub fn resolve_args(
    requester: &str,
    args: &[ArgSpec],
    manifest: &DeploymentManifest,
) -> Result<Vec<DynSolValue>, DeployError> {
    args.iter()
        .map(|arg| match arg {
            ArgSpec::Literal(value) => Ok(value.clone()),
            ArgSpec::Ref(name) => manifest
                .get(name)
                .map(DynSolValue::Address)
                .ok_or_else(|| DeployError::ReferenceNotReady {
                    requester: requester.to_string(),
                    reference: name.clone(),
                }),
        })
        .collect()
}

/// ABI-encode resolved constructor arguments for appending to creation code.
pub fn encode_constructor_args(values: Vec<DynSolValue>) -> Bytes {
    if values.is_empty() {
        return Bytes::new();
    }
    DynSolValue::Tuple(values).abi_encode_params().into()
}

/// A deployable unit.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Logical name, the manifest key
    pub name: String,
    /// Compiled contract to instantiate
    pub artifact: String,
    /// Constructor arguments in order
    pub args: Vec<ArgSpec>,
    address: Option<Address>,
}

impl ComponentDescriptor {
    /// Descriptor whose artifact carries the same name.
    pub fn new(name: impl Into<String>, args: Vec<ArgSpec>) -> Self {
        let name = name.into();
        Self {
            artifact: name.clone(),
            name,
            args,
            address: None,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = artifact.into();
        self
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn is_deployed(&self) -> bool {
        self.address.is_some()
    }

    /// Names this descriptor's constructor depends on.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(ArgSpec::referenced)
    }

    /// Resolved and encoded constructor arguments.
    pub fn encoded_args(&self, manifest: &DeploymentManifest) -> Result<Bytes, DeployError> {
        Ok(encode_constructor_args(resolve_args(
            &self.name, &self.args, manifest,
        )?))
    }
}

/// Every component of a deployment, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    descriptors: Vec<ComponentDescriptor>,
    by_name: HashMap<String, usize>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Result<(), DeployError> {
        if self.by_name.contains_key(&descriptor.name) {
            return Err(DeployError::DuplicateComponent {
                name: descriptor.name,
            });
        }
        self.by_name
            .insert(descriptor.name.clone(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.by_name.get(name).map(|&i| &self.descriptors[i])
    }

    /// Record the deployed address. A descriptor transitions once.
    pub fn mark_deployed(&mut self, name: &str, address: Address) -> Result<(), DeployError> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| DeployError::UnknownComponent {
                name: name.to_string(),
            })?;
        let descriptor = &mut self.descriptors[index];
        if let Some(existing) = descriptor.address {
            return Err(DeployError::AlreadyDeployed {
                name: name.to_string(),
                address: existing.to_string(),
            });
        }
        descriptor.address = Some(address);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Declared names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.descriptors.iter()
    }
}
