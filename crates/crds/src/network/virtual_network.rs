//! VirtualNetwork Custom Resource Definition

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// VirtualNetworkSpec defines the desired state of an Azure virtual network
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "network.azure.microscaler.io",
    version = "v1alpha1",
    kind = "VirtualNetwork",
    namespaced,
    status = "VirtualNetworkStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkSpec {
    /// Azure-specific parameters
    pub for_provider: VirtualNetworkParameters,

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

/// Parameters of an Azure virtual network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Azure region
    pub location: String,

    /// Address space of the network
    pub address_space: AddressSpace,

    /// Enable DDoS protection for all protected resources in the network
    #[serde(default)]
    pub enable_ddos_protection: bool,

    /// Enable VM protection for all subnets in the network
    #[serde(default)]
    pub enable_vm_protection: bool,

    /// Resource tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Address prefixes available to a virtual network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    /// CIDR blocks, e.g. ["10.0.0.0/16"]
    pub address_prefixes: Vec<String>,
}

/// Observed state of an Azure virtual network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkObservation {
    /// Azure resource ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Entity tag, changes whenever the resource changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Resource GUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,

    /// Provisioning state reported by Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    /// Azure resource type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// VirtualNetworkStatus defines the observed state of a VirtualNetwork
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkStatus {
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Observed Azure state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<VirtualNetworkObservation>,
}

crate::impl_managed!(VirtualNetwork, VirtualNetworkObservation);
