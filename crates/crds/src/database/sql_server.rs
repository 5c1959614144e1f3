//! MySQLServer and PostgreSQLServer Custom Resource Definitions

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// MySQLServerSpec defines the desired state of an Azure Database for MySQL server
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "database.azure.microscaler.io",
    version = "v1alpha1",
    kind = "MySQLServer",
    namespaced,
    status = "SQLServerStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MySQLServerSpec {
    /// Azure-specific parameters
    pub for_provider: SQLServerParameters,

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

/// PostgreSQLServerSpec defines the desired state of an Azure Database for PostgreSQL server
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "database.azure.microscaler.io",
    version = "v1alpha1",
    kind = "PostgreSQLServer",
    namespaced,
    status = "SQLServerStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PostgreSQLServerSpec {
    /// Azure-specific parameters
    pub for_provider: SQLServerParameters,

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

/// Parameters shared by MySQL and PostgreSQL single servers
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SQLServerParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Azure region
    pub location: String,

    /// Pricing tier and compute
    pub sku: SKU,

    /// Administrator login; the password is generated on create
    pub administrator_login: String,

    /// Engine version, e.g. "5.7" or "11"
    pub version: String,

    /// Enforce SSL connections
    #[serde(default)]
    pub ssl_enforcement: SslEnforcement,

    /// Minimum TLS version, e.g. "TLS1_2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimal_tls_version: Option<String>,

    /// Storage settings
    pub storage_profile: StorageProfile,

    /// "Enabled" or "Disabled"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<String>,

    /// Resource tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Server SKU
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SKU {
    /// Basic, GeneralPurpose or MemoryOptimized
    pub tier: String,

    /// vCores
    pub capacity: i32,

    /// Hardware generation, e.g. "Gen5"
    pub family: String,
}

/// SSL enforcement mode
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum SslEnforcement {
    #[default]
    Enabled,
    Disabled,
}

/// Storage profile of a server
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    /// Max storage in MB
    #[serde(rename = "storageMB")]
    pub storage_mb: i32,

    /// Backup retention days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_retention_days: Option<i32>,

    /// "Enabled" or "Disabled"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_redundant_backup: Option<String>,

    /// "Enabled" or "Disabled"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_autogrow: Option<String>,
}

/// Observed state of a MySQL or PostgreSQL server
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SQLServerObservation {
    /// Azure resource ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Hostname clients connect to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_domain_name: Option<String>,

    /// Ready, Dropping, Disabled, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_visible_state: Option<String>,

    /// Running engine version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Status shared by MySQLServer and PostgreSQLServer
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SQLServerStatus {
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Observed Azure state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<SQLServerObservation>,
}

crate::impl_managed!(MySQLServer, SQLServerObservation);
crate::impl_managed!(PostgreSQLServer, SQLServerObservation);
