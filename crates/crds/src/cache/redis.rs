//! Redis Custom Resource Definition
//!
//! Defines a Kubernetes CRD for Azure Cache for Redis. Connection details
//! (endpoint, SSL port and primary access key) are published to the
//! connection secret once the cache is available.

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// RedisSpec defines the desired state of an Azure Cache for Redis
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "cache.azure.microscaler.io",
    version = "v1alpha1",
    kind = "Redis",
    plural = "redis",
    namespaced,
    status = "RedisStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    /// Azure-specific parameters
    pub for_provider: RedisParameters,

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

/// Parameters of an Azure Cache for Redis
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedisParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Azure region
    pub location: String,

    /// Pricing tier of the cache
    pub sku: RedisSku,

    /// Enable the non-SSL port (6379)
    #[serde(default)]
    pub enable_non_ssl_port: bool,

    /// Redis configuration settings, e.g. maxmemory-policy
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub redis_configuration: BTreeMap<String, String>,

    /// Number of shards (Premium clusters only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i32>,

    /// Static IP inside `subnetId`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_ip: Option<String>,

    /// Full resource ID of a subnet to deploy the cache into (Premium only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    /// Minimum TLS version clients must use, e.g. "1.2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_tls_version: Option<String>,

    /// Availability zones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    /// Resource tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Pricing tier of a Redis cache
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedisSku {
    /// SKU name
    pub name: RedisSkuName,

    /// SKU family: C (Basic/Standard) or P (Premium)
    pub family: RedisSkuFamily,

    /// Cache size: 0-6 for C, 1-5 for P
    pub capacity: i32,
}

/// Redis SKU name
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum RedisSkuName {
    #[default]
    Basic,
    Standard,
    Premium,
}

/// Redis SKU family
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum RedisSkuFamily {
    #[default]
    C,
    P,
}

/// Observed state of an Azure Cache for Redis
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedisObservation {
    /// Azure resource ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Provisioning state reported by Azure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    /// Host name of the cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,

    /// Non-SSL port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    /// SSL port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_port: Option<i32>,

    /// Redis server version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_version: Option<String>,
}

/// RedisStatus defines the observed state of a Redis cache
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RedisStatus {
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Observed Azure state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<RedisObservation>,
}

crate::impl_managed!(Redis, RedisObservation);
