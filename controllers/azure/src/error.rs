//! Controller-specific error types.
//!
//! This module defines error types specific to the Azure provider controller
//! that are not covered by upstream library errors.

use azure_client::AzureError;
use crds::CrdError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Azure provider controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Azure API error
    #[error("Azure error: {0}")]
    Azure(#[from] AzureError),

    /// Invalid managed resource
    #[error("{0}")]
    Crd(#[from] CrdError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource parameters Azure would reject
    #[error("Invalid parameters: {0}")]
    InvalidSpec(String),

    /// ProviderConfig missing or unusable
    #[error("Cannot connect to Azure: {0}")]
    ProviderConfig(String),

    /// A referenced managed resource exists but is not Ready
    #[error("referenced {kind} {name} not ready")]
    ReferenceNotReady { kind: String, name: String },

    /// A required name is neither set nor resolvable from a reference
    #[error("{0} is not set and has no reference")]
    Unresolved(String),

    /// Secret missing a key the resource depends on
    #[error("Secret error: {0}")]
    Secret(String),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether the error means the Azure object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControllerError::Azure(e) if e.is_not_found())
    }
}
