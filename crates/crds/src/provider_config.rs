//! ProviderConfig Custom Resource Definition
//!
//! Cluster-scoped; every managed resource names one (or falls back to
//! `default`) to obtain Azure credentials.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfigSpec defines how the controller authenticates to Azure
#[derive(kube::CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "azure.microscaler.io",
    version = "v1alpha1",
    kind = "ProviderConfig",
    status = "ProviderConfigStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Credential source
    pub credentials: ProviderCredentials,

    /// Subscription ID (required unless the credentials secret carries it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    /// Tenant ID (required unless the credentials secret carries it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Where credentials come from
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Credential source
    pub source: CredentialsSource,

    /// Secret with the `--sdk-auth` JSON (source `Secret`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<CredentialsSecretRef>,

    /// Client ID of the federated identity (source `WorkloadIdentity`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Credential source kinds
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Service principal JSON stored in a Secret
    #[default]
    Secret,
    /// Federated token projected into the controller pod
    WorkloadIdentity,
    /// Managed identity of the node or pod
    InjectedIdentity,
}

/// Secret key holding provider credentials
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsSecretRef {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

/// ProviderConfigStatus reports how many resources use this config
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    /// Human-readable state of the config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
