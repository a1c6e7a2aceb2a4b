//! Deployment error taxonomy.
//!
//! Every variant aborts the run. None are retried.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while planning or executing a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Malformed asset or protocol parameters, caught before any network
    /// interaction.
    #[error("invalid configuration for {subject}: {reason}")]
    ConfigValidation { subject: String, reason: String },

    /// A component or call references a name that is not in the manifest
    /// yet. This is a defect in the plan's stage order.
    #[error("{requester} references {reference}, which is not deployed yet")]
    ReferenceNotReady { requester: String, reference: String },

    /// The same logical name was registered twice.
    #[error("component {name} is declared more than once")]
    DuplicateComponent { name: String },

    /// A plan step names a component that was never registered.
    #[error("unknown component {name}")]
    UnknownComponent { name: String },

    /// A descriptor was marked deployed twice.
    #[error("component {name} is already deployed at {address}")]
    AlreadyDeployed { name: String, address: String },

    /// A wiring call whose signature or arguments do not agree.
    #[error("malformed call {call}: {reason}")]
    InvalidCall { call: String, reason: String },

    /// A creation reverted, timed out, or could not be submitted.
    #[error("deployment of {component} failed: {reason}")]
    Deployment { component: String, reason: String },

    /// A creation was confirmed but yielded no contract address.
    #[error("deployment of {component} confirmed without a contract address")]
    MissingAddress { component: String },

    /// A wiring call reverted or could not be submitted.
    #[error("call {call} failed: {reason}")]
    Call { call: String, reason: String },

    /// The manifest would map a name to a second, different address.
    #[error("manifest already maps {name} to {existing}, refusing {attempted}")]
    ManifestConflict {
        name: String,
        existing: String,
        attempted: String,
    },

    /// A run finished without an address for every declared component.
    #[error("manifest is missing declared components: {}", .names.join(", "))]
    IncompleteManifest { names: Vec<String> },

    /// Persisting the manifest failed.
    #[error("failed to write manifest {}", .path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    pub(crate) fn config(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigValidation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Short, stable name of the error class, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigValidation { .. } => "config_validation",
            Self::ReferenceNotReady { .. } => "reference_not_ready",
            Self::DuplicateComponent { .. }
            | Self::UnknownComponent { .. }
            | Self::AlreadyDeployed { .. }
            | Self::InvalidCall { .. } => "plan_definition",
            Self::Deployment { .. } => "deployment",
            Self::MissingAddress { .. } => "missing_address",
            Self::Call { .. } => "call",
            Self::ManifestConflict { .. } | Self::IncompleteManifest { .. } => "manifest",
            Self::ManifestWrite { .. } => "manifest_write",
        }
    }

    /// Whether the error points at the plan itself rather than the network
    /// or the input data.
    pub fn is_plan_defect(&self) -> bool {
        matches!(
            self,
            Self::ReferenceNotReady { .. }
                | Self::DuplicateComponent { .. }
                | Self::UnknownComponent { .. }
                | Self::AlreadyDeployed { .. }
                | Self::InvalidCall { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_component() {
        let err = DeployError::MissingAddress {
            component: "UsdtHandlerProxy".to_string(),
        };
        assert!(err.to_string().contains("UsdtHandlerProxy"));

        let err = DeployError::IncompleteManifest {
            names: vec!["Manager".to_string(), "callProxy".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "manifest is missing declared components: Manager, callProxy"
        );
    }

    #[test]
    fn test_kind_classification() {
        let err = DeployError::ReferenceNotReady {
            requester: "Manager".to_string(),
            reference: "OracleProxy".to_string(),
        };
        assert_eq!(err.kind(), "reference_not_ready");
        assert!(err.is_plan_defect());

        let err = DeployError::Call {
            call: "Manager.handlerRegister".to_string(),
            reason: "execution reverted".to_string(),
        };
        assert!(!err.is_plan_defect());

        let err = DeployError::InvalidCall {
            call: "Manager.handlerRegister".to_string(),
            reason: "takes 2 arguments, got 1".to_string(),
        };
        assert_eq!(err.kind(), "plan_definition");
        assert!(err.is_plan_defect());

        let err = DeployError::IncompleteManifest {
            names: vec!["callProxy".to_string()],
        };
        assert!(!err.is_plan_defect());
        assert!(!DeployError::config("asset 0 (Coin)", "decimals 19 exceeds 18").is_plan_defect());
    }
}
