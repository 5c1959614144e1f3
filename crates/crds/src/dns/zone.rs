//! DnsZone Custom Resource Definition

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// DnsZoneSpec defines the desired state of an Azure DNS zone
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "dns.azure.microscaler.io",
    version = "v1alpha1",
    kind = "DnsZone",
    namespaced,
    status = "DnsZoneStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DnsZoneSpec {
    /// Azure-specific parameters
    pub for_provider: DnsZoneParameters,

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

/// Parameters of an Azure DNS zone
///
/// The external name is the zone name, e.g. "example.com".
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsZoneParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Public or Private zone
    #[serde(default)]
    pub zone_type: ZoneType,

    /// Resource tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// DNS zone type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ZoneType {
    #[default]
    Public,
    Private,
}

/// Observed state of an Azure DNS zone
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsZoneObservation {
    /// Azure resource ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Entity tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Name servers delegated for the zone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,

    /// Number of record sets in the zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,

    /// Maximum number of record sets allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
}

/// DnsZoneStatus defines the observed state of a DnsZone
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DnsZoneStatus {
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Observed Azure state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<DnsZoneObservation>,
}

crate::impl_managed!(DnsZone, DnsZoneObservation);
