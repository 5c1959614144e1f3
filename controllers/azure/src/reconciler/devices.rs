//! IoT Hub routing endpoint reconciler
//!
//! Handles: IotHubEndpoint
//!
//! Endpoints are entries in the hub's routing lists rather than ARM resources
//! of their own. Every write reads the hub, edits the list and writes the
//! whole hub back guarded by its etag, so a concurrent change makes the write
//! fail with 412 and the next reconcile starts over from a fresh read.

use crate::connection::SecretStore;
use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
};
use crate::reconcile_helpers::{external_name, found, required};
use crate::references::{Resolved, Resolver};
use azure_client::models::{IotHubDescription, RoutingEndpoint};
use azure_client::AzureClientTrait;
use crds::{
    Condition, EndpointType, IotHubEndpoint, IotHubEndpointObservation, IotHubEndpointParameters, ResourceGroup,
};
use std::sync::Arc;
use tracing::debug;

const ENDPOINT_TYPES: [EndpointType; 4] = [
    EndpointType::EventHub,
    EndpointType::ServiceBusQueue,
    EndpointType::ServiceBusTopic,
    EndpointType::StorageContainer,
];

#[async_trait::async_trait]
impl ManagedKind for IotHubEndpoint {
    async fn resolve_references(&self, resolver: &Resolver) -> Result<Resolved, ControllerError> {
        let p = &self.spec.for_provider;
        let mut resolved = Resolved::new();
        resolver
            .name::<ResourceGroup>(
                &mut resolved,
                "resourceGroupName",
                p.resource_group_name.as_deref(),
                p.resource_group_name_ref.as_ref(),
            )
            .await?;
        Ok(resolved)
    }

    fn external(ctx: ExternalContext<IotHubEndpointObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(IotHubEndpointClient {
            azure: ctx.azure,
            secrets: ctx.secrets,
            namespace: ctx.namespace,
        })
    }
}

pub(crate) struct IotHubEndpointClient {
    azure: Arc<dyn AzureClientTrait>,
    secrets: Arc<dyn SecretStore>,
    namespace: String,
}

/// Whether an observed endpoint matches the parameters
///
/// Azure masks connection strings on read and fills in ids and extra
/// properties, so those are not compared.
pub fn endpoint_up_to_date(p: &IotHubEndpointParameters, endpoint: &RoutingEndpoint) -> bool {
    endpoint.container_name == p.container_name
        && endpoint.encoding == p.encoding
        && endpoint.file_name_format == p.file_name_format
        && endpoint.batch_frequency_in_seconds == p.batch_frequency_in_seconds
        && endpoint.max_chunk_size_in_bytes == p.max_chunk_size_in_bytes
}

/// Locate the endpoint named `name` in any of the hub's routing lists
pub fn find_endpoint(
    hub: &IotHubDescription,
    name: &str,
) -> Result<Option<(EndpointType, RoutingEndpoint)>, ControllerError> {
    for endpoint_type in ENDPOINT_TYPES {
        let found = hub
            .routing_endpoints(endpoint_type.routing_key())?
            .into_iter()
            .find(|e| e.name == name);
        if let Some(endpoint) = found {
            return Ok(Some((endpoint_type, endpoint)));
        }
    }
    Ok(None)
}

/// Remove `name` from every routing list; returns whether anything was removed
fn remove_endpoint(hub: &mut IotHubDescription, name: &str) -> Result<bool, ControllerError> {
    let mut removed = false;
    for endpoint_type in ENDPOINT_TYPES {
        let key = endpoint_type.routing_key();
        let mut endpoints = hub.routing_endpoints(key)?;
        let before = endpoints.len();
        endpoints.retain(|e| e.name != name);
        if endpoints.len() != before {
            hub.set_routing_endpoints(key, &endpoints)?;
            removed = true;
        }
    }
    Ok(removed)
}

fn hub_location(p: &IotHubEndpointParameters) -> Result<(&str, &str), ControllerError> {
    Ok((
        required(p.resource_group_name.as_deref(), "resourceGroupName")?,
        required(Some(p.iot_hub_name.as_str()), "iotHubName")?,
    ))
}

impl IotHubEndpointClient {
    async fn connection_string(&self, p: &IotHubEndpointParameters) -> Result<String, ControllerError> {
        let selector = &p.connection_string_secret_ref;
        let namespace = selector.namespace.as_deref().unwrap_or(&self.namespace);
        let value = self
            .secrets
            .get_key(namespace, &selector.name, &selector.key)
            .await?;
        String::from_utf8(value).map_err(|_| {
            ControllerError::Secret(format!(
                "secret {}/{} key {} is not UTF-8",
                namespace, selector.name, selector.key
            ))
        })
    }

    /// Write the endpoint into the list for its type, replacing any entry of the same name
    async fn upsert(&self, cr: &IotHubEndpoint) -> Result<(), ControllerError> {
        let p = &cr.spec.for_provider;
        let (rg, hub_name) = hub_location(p)?;
        let name = external_name(cr);
        let connection_string = self.connection_string(p).await?;

        let mut hub = self.azure.get_iot_hub(rg, hub_name).await?;
        remove_endpoint(&mut hub, &name)?;

        let key = p.endpoint_type.routing_key();
        let mut endpoints = hub.routing_endpoints(key)?;
        endpoints.push(RoutingEndpoint {
            name: name.clone(),
            connection_string: Some(connection_string),
            subscription_id: Some(self.azure.subscription_id().to_string()),
            resource_group: Some(rg.to_string()),
            container_name: p.container_name.clone(),
            encoding: p.encoding.clone(),
            file_name_format: p.file_name_format.clone(),
            batch_frequency_in_seconds: p.batch_frequency_in_seconds,
            max_chunk_size_in_bytes: p.max_chunk_size_in_bytes,
            ..Default::default()
        });
        hub.set_routing_endpoints(key, &endpoints)?;

        let etag = hub.etag.clone();
        self.azure
            .update_iot_hub(rg, hub_name, &hub, etag.as_deref())
            .await?;
        debug!("Wrote endpoint {} to IoT Hub {}", name, hub_name);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ExternalClient<IotHubEndpoint> for IotHubEndpointClient {
    async fn observe(
        &self,
        cr: &IotHubEndpoint,
    ) -> Result<ExternalObservation<IotHubEndpointObservation>, ControllerError> {
        let p = &cr.spec.for_provider;
        let (rg, hub_name) = hub_location(p)?;
        let Some(hub) = found(self.azure.get_iot_hub(rg, hub_name).await)? else {
            return Ok(ExternalObservation::missing());
        };
        let Some((endpoint_type, endpoint)) = find_endpoint(&hub, &external_name(cr))? else {
            return Ok(ExternalObservation::missing());
        };

        let up_to_date = endpoint_type == p.endpoint_type && endpoint_up_to_date(p, &endpoint);
        let observation = IotHubEndpointObservation {
            id: endpoint.id,
            hub_etag: hub.etag,
            endpoint_type: Some(endpoint_type),
        };
        Ok(ExternalObservation::exists(observation, Condition::available(), up_to_date))
    }

    async fn create(&self, cr: &IotHubEndpoint) -> Result<ExternalCreation, ControllerError> {
        self.upsert(cr).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &IotHubEndpoint) -> Result<ExternalUpdate, ControllerError> {
        self.upsert(cr).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &IotHubEndpoint) -> Result<(), ControllerError> {
        let (rg, hub_name) = hub_location(&cr.spec.for_provider)?;
        let Some(mut hub) = found(self.azure.get_iot_hub(rg, hub_name).await)? else {
            return Ok(());
        };
        if !remove_endpoint(&mut hub, &external_name(cr))? {
            return Ok(());
        }
        let etag = hub.etag.clone();
        self.azure
            .update_iot_hub(rg, hub_name, &hub, etag.as_deref())
            .await?;
        Ok(())
    }
}
