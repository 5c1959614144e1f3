//! Cross-resource references for managed resources
//!
//! Managed resources point at each other by name (a `Subnet` names the
//! `VirtualNetwork` it lives in, a firewall rule names its server). The
//! reference is resolved by the controller into the referenced resource's
//! external name and written back into the referencing spec.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to another managed resource in the same namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    /// Name of the referenced resource
    pub name: String,
}

impl ResourceReference {
    /// Create a reference to the named resource
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Reference to the ProviderConfig that supplies Azure credentials
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    /// Name of the cluster-scoped ProviderConfig
    pub name: String,
}

/// Reference to a Kubernetes Secret
///
/// Used for connection secrets; the namespace defaults to the namespace of
/// the managed resource.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Name of the secret
    pub name: String,

    /// Namespace of the secret (defaults to the resource namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Selects a single key of a Kubernetes Secret
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Name of the secret
    pub name: String,

    /// Namespace of the secret (defaults to the resource namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Key within the secret data
    pub key: String,
}
