//! Microsoft.Devices IoT Hub models
//!
//! The hub is written back as a whole when routing endpoints change, so
//! everything outside `properties.routing.endpoints` is kept as raw JSON.

use crate::error::AzureError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// IoT Hub description
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IotHubDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub sku: Value,
    #[serde(default)]
    pub properties: Value,
}

/// A routing endpoint of any type
///
/// Fields not listed here (`authenticationType`, `endpointUri`, ...) are kept
/// in `extra` so they survive a read-modify-write cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingEndpoint {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_frequency_in_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size_in_bytes: Option<i32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl IotHubDescription {
    /// Endpoints listed under `properties.routing.endpoints.<key>`
    pub fn routing_endpoints(&self, key: &str) -> Result<Vec<RoutingEndpoint>, AzureError> {
        match self.properties.pointer(&format!("/routing/endpoints/{key}")) {
            Some(list) if !list.is_null() => Ok(serde_json::from_value(list.clone())?),
            _ => Ok(Vec::new()),
        }
    }

    /// Replace the endpoint list under `properties.routing.endpoints.<key>`
    pub fn set_routing_endpoints(
        &mut self,
        key: &str,
        endpoints: &[RoutingEndpoint],
    ) -> Result<(), AzureError> {
        let value = serde_json::to_value(endpoints)?;
        let properties = object_entry(&mut self.properties)?;
        let routing = object_entry(
            properties
                .entry("routing")
                .or_insert_with(|| Value::Object(Map::new())),
        )?;
        let lists = object_entry(
            routing
                .entry("endpoints")
                .or_insert_with(|| Value::Object(Map::new())),
        )?;
        lists.insert(key.to_string(), value);
        Ok(())
    }
}

fn object_entry(value: &mut Value) -> Result<&mut Map<String, Value>, AzureError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value
        .as_object_mut()
        .ok_or_else(|| AzureError::InvalidRequest("IoT Hub properties are not an object".to_string()))
}
