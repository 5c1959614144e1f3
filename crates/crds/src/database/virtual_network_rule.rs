//! MySQLServerVirtualNetworkRule and PostgreSQLServerVirtualNetworkRule Custom Resource Definitions

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// MySQLServerVirtualNetworkRuleSpec admits a subnet to a MySQL server
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "database.azure.microscaler.io",
    version = "v1alpha1",
    kind = "MySQLServerVirtualNetworkRule",
    namespaced,
    status = "VirtualNetworkRuleStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MySQLServerVirtualNetworkRuleSpec {
    pub for_provider: VirtualNetworkRuleParameters,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// PostgreSQLServerVirtualNetworkRuleSpec admits a subnet to a PostgreSQL server
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "database.azure.microscaler.io",
    version = "v1alpha1",
    kind = "PostgreSQLServerVirtualNetworkRule",
    namespaced,
    status = "VirtualNetworkRuleStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PostgreSQLServerVirtualNetworkRuleSpec {
    pub for_provider: VirtualNetworkRuleParameters,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// Parameters of a server virtual network rule
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkRuleParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Server name (resolved from `serverNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// Reference to a server of the same engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name_ref: Option<ResourceReference>,

    /// ARM ID of the subnet (resolved from `virtualNetworkSubnetIdRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_subnet_id: Option<String>,

    /// Reference to a Subnet; resolves to its `status.atProvider.id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_subnet_id_ref: Option<ResourceReference>,

    /// Create the rule before the subnet has the Microsoft.Sql service endpoint
    #[serde(default)]
    pub ignore_missing_vnet_service_endpoint: bool,
}

/// Observed state of a virtual network rule
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkRuleObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Initializing, InProgress, Ready, Deleting, Unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// Status shared by both virtual network rule kinds
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkRuleStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<VirtualNetworkRuleObservation>,
}

crate::impl_managed!(MySQLServerVirtualNetworkRule, VirtualNetworkRuleObservation);
crate::impl_managed!(PostgreSQLServerVirtualNetworkRule, VirtualNetworkRuleObservation);
