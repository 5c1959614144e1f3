//! Storage Account Custom Resource Definition
//!
//! Storage account names are global across Azure: 3-24 characters, lowercase
//! letters and digits only. The controller validates the external name before
//! creating the account.

use crate::conditions::Condition;
use crate::error::CrdError;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// AccountSpec defines the desired state of an Azure storage account
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "storage.azure.microscaler.io",
    version = "v1alpha1",
    kind = "Account",
    namespaced,
    status = "AccountStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct AccountSpec {
    /// Azure-specific parameters
    pub for_provider: AccountParameters,

    /// ProviderConfig supplying credentials (defaults to "default")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    /// Whether to delete or orphan the Azure resource on deletion
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Secret to write connection details to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// Parameters of an Azure storage account
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Azure region
    pub location: String,

    /// Replication SKU, e.g. "Standard_LRS"
    pub sku_name: String,

    /// Account kind
    #[serde(default)]
    pub kind: StorageKind,

    /// Access tier for blob data (BlobStorage and StorageV2 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<AccessTier>,

    /// Only allow HTTPS traffic
    #[serde(default = "default_https_only")]
    pub enable_https_traffic_only: bool,

    /// Minimum TLS version, e.g. "TLS1_2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_tls_version: Option<String>,

    /// Allow anonymous public read access to blobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_blob_public_access: Option<bool>,

    /// Resource tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

fn default_https_only() -> bool {
    true
}

/// Storage account kind
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum StorageKind {
    Storage,
    #[default]
    StorageV2,
    BlobStorage,
    BlockBlobStorage,
    FileStorage,
}

/// Blob access tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum AccessTier {
    Hot,
    Cool,
}

/// Public endpoints of a storage account
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageEndpoints {
    /// Blob endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,

    /// Queue endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,

    /// Table endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// File endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Static website endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<String>,

    /// Data Lake endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs: Option<String>,
}

/// Observed state of an Azure storage account
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountObservation {
    /// Azure resource ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Provisioning state reported by Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    /// Public endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_endpoints: Option<StorageEndpoints>,

    /// Availability of the primary location ("available" / "unavailable")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_of_primary: Option<String>,

    /// Creation time as reported by Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

/// AccountStatus defines the observed state of a storage Account
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Observed Azure state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<AccountObservation>,
}

crate::impl_managed!(Account, AccountObservation);

/// Check a storage account name: 3-24 characters, lowercase letters and digits
pub fn validate_account_name(name: &str) -> Result<(), CrdError> {
    if !(3..=24).contains(&name.len()) {
        return Err(CrdError::InvalidName {
            name: name.to_string(),
            reason: "must be between 3 and 24 characters".to_string(),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(CrdError::InvalidName {
            name: name.to_string(),
            reason: "must contain only lowercase letters and digits".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_account_name() {
        assert!(validate_account_name("mystorage01").is_ok());
        assert!(validate_account_name("abc").is_ok());
        assert!(validate_account_name("ab").is_err());
        assert!(validate_account_name(&"a".repeat(25)).is_err());
        assert!(validate_account_name("My-Storage").is_err());
    }

    #[test]
    fn test_account_defaults() {
        let json = serde_json::json!({
            "location": "westeurope",
            "skuName": "Standard_LRS"
        });
        let params: AccountParameters = serde_json::from_value(json).unwrap();
        assert_eq!(params.kind, StorageKind::StorageV2);
        assert!(params.enable_https_traffic_only);
        assert!(params.access_tier.is_none());
    }
}
