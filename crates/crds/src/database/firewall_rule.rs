//! MySQLServerFirewallRule and PostgreSQLServerFirewallRule Custom Resource Definitions

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// MySQLServerFirewallRuleSpec defines an IP range allowed to reach a MySQL server
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "database.azure.microscaler.io",
    version = "v1alpha1",
    kind = "MySQLServerFirewallRule",
    namespaced,
    status = "FirewallRuleStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MySQLServerFirewallRuleSpec {
    pub for_provider: FirewallRuleParameters,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// PostgreSQLServerFirewallRuleSpec defines an IP range allowed to reach a PostgreSQL server
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "database.azure.microscaler.io",
    version = "v1alpha1",
    kind = "PostgreSQLServerFirewallRule",
    namespaced,
    status = "FirewallRuleStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PostgreSQLServerFirewallRuleSpec {
    pub for_provider: FirewallRuleParameters,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// Parameters of a server firewall rule
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleParameters {
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

    /// First IPv4 address of the range
    pub start_ip_address: String,

    /// Last IPv4 address of the range
    pub end_ip_address: String,
}

/// Observed state of a firewall rule
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// Status shared by both firewall rule kinds
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<FirewallRuleObservation>,
}

crate::impl_managed!(MySQLServerFirewallRule, FirewallRuleObservation);
crate::impl_managed!(PostgreSQLServerFirewallRule, FirewallRuleObservation);
