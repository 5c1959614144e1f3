//! Subnet Custom Resource Definition
//!
//! A subnet lives inside a virtual network; both the resource group and the
//! network may be given by name or by reference.

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SubnetSpec defines the desired state of an Azure subnet
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "network.azure.microscaler.io",
    version = "v1alpha1",
    kind = "Subnet",
    namespaced,
    status = "SubnetStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    /// Azure-specific parameters
    pub for_provider: SubnetParameters,

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

/// Parameters of an Azure subnet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Virtual network name (resolved from `virtualNetworkNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_name: Option<String>,

    /// Reference to a VirtualNetwork
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_name_ref: Option<ResourceReference>,

    /// Address prefix of the subnet, e.g. "10.0.1.0/24"
    pub address_prefix: String,

    /// Service endpoints enabled on the subnet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_endpoints: Vec<ServiceEndpoint>,
}

/// A service endpoint enabled on a subnet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    /// Service type, e.g. "Microsoft.Sql"
    pub service: String,
}

/// Observed state of an Azure subnet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetObservation {
    /// Azure resource ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Entity tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Provisioning state reported by Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    /// Purpose of the subnet as set by Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// SubnetStatus defines the observed state of a Subnet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubnetStatus {
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Observed Azure state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<SubnetObservation>,
}

crate::impl_managed!(Subnet, SubnetObservation);
