//! IotHubEndpoint Custom Resource Definition
//!
//! An IoT Hub routing endpoint is not a standalone ARM resource: it lives in
//! the hub's `properties.routing.endpoints` lists, one list per endpoint type.
//! The external name is the endpoint name inside the hub.

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{
    ProviderConfigReference, ResourceReference, SecretKeySelector, SecretReference,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// IotHubEndpointSpec defines a routing endpoint on an existing IoT Hub
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "devices.azure.microscaler.io",
    version = "v1alpha1",
    kind = "IotHubEndpoint",
    namespaced,
    status = "IotHubEndpointStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct IotHubEndpointSpec {
    /// Azure-specific parameters
    pub for_provider: IotHubEndpointParameters,

    /// ProviderConfig supplying credentials (defaults to "default")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    /// Whether to delete or orphan the endpoint on deletion
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Secret to write connection details to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// Parameters of an IoT Hub routing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IotHubEndpointParameters {
    /// Resource group of the hub (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Name of the IoT Hub owning the endpoint
    pub iot_hub_name: String,

    /// Endpoint type
    pub endpoint_type: EndpointType,

    /// Secret key holding the connection string of the target
    pub connection_string_secret_ref: SecretKeySelector,

    /// Blob container (StorageContainer only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    /// "avro" or "avrodeflate" (StorageContainer only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Blob name format (StorageContainer only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name_format: Option<String>,

    /// Seconds between blob writes, 60-720 (StorageContainer only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_frequency_in_seconds: Option<i32>,

    /// Bytes per blob before a flush (StorageContainer only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size_in_bytes: Option<i32>,
}

/// Routing endpoint type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum EndpointType {
    #[default]
    EventHub,
    ServiceBusQueue,
    ServiceBusTopic,
    StorageContainer,
}

impl EndpointType {
    /// Key of the endpoint list under `routing.endpoints`
    pub fn routing_key(&self) -> &'static str {
        match self {
            EndpointType::EventHub => "eventHubs",
            EndpointType::ServiceBusQueue => "serviceBusQueues",
            EndpointType::ServiceBusTopic => "serviceBusTopics",
            EndpointType::StorageContainer => "storageContainers",
        }
    }
}

/// Observed state of a routing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IotHubEndpointObservation {
    /// Endpoint ID assigned by the hub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Etag of the hub at the last observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_etag: Option<String>,

    /// Endpoint type found in the hub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_type: Option<EndpointType>,
}

/// IotHubEndpointStatus defines the observed state of an IotHubEndpoint
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct IotHubEndpointStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<IotHubEndpointObservation>,
}

crate::impl_managed!(IotHubEndpoint, IotHubEndpointObservation);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_keys() {
        assert_eq!(EndpointType::EventHub.routing_key(), "eventHubs");
        assert_eq!(EndpointType::StorageContainer.routing_key(), "storageContainers");
    }

    #[test]
    fn test_deserialize_endpoint_spec() {
        let json = serde_json::json!({
            "forProvider": {
                "resourceGroupName": "rg",
                "iotHubName": "hub",
                "endpointType": "ServiceBusQueue",
                "connectionStringSecretRef": {"name": "sb", "key": "connection"}
            }
        });
        let spec: IotHubEndpointSpec = serde_json::from_value(json).unwrap();
        assert_eq!(spec.for_provider.endpoint_type, EndpointType::ServiceBusQueue);
        assert_eq!(spec.deletion_policy, DeletionPolicy::Delete);
        assert!(spec.for_provider.container_name.is_none());
    }
}
