//! Azure Cache for Redis reconciler
//!
//! Handles: Redis

use crate::connection::{details, keys};
use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
};
use crate::reconcile_helpers::{external_name, found, optional_matches, ready_from_provisioning_state, required};
use crate::references::{Resolved, Resolver};
use azure_client::error::ignore_not_found;
use azure_client::{AzureClientTrait, models};
use crds::{Redis, RedisObservation, RedisParameters, RedisSkuFamily, RedisSkuName, ResourceGroup};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

const SUCCEEDED: &str = "Succeeded";

#[async_trait::async_trait]
impl ManagedKind for Redis {
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

    fn external(ctx: ExternalContext<RedisObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(RedisClient { azure: ctx.azure })
    }
}

pub(crate) struct RedisClient {
    azure: Arc<dyn AzureClientTrait>,
}

fn sku_name(name: RedisSkuName) -> &'static str {
    match name {
        RedisSkuName::Basic => "Basic",
        RedisSkuName::Standard => "Standard",
        RedisSkuName::Premium => "Premium",
    }
}

fn sku_family(family: RedisSkuFamily) -> &'static str {
    match family {
        RedisSkuFamily::C => "C",
        RedisSkuFamily::P => "P",
    }
}

/// Create body for a cache
pub fn desired_cache(p: &RedisParameters) -> models::RedisResource {
    models::RedisResource {
        location: p.location.clone(),
        tags: p.tags.clone(),
        zones: p.zones.clone(),
        properties: models::RedisProperties {
            sku: Some(models::RedisSku {
                name: sku_name(p.sku.name).to_string(),
                family: sku_family(p.sku.family).to_string(),
                capacity: p.sku.capacity,
            }),
            enable_non_ssl_port: Some(p.enable_non_ssl_port),
            redis_configuration: p
                .redis_configuration
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            shard_count: p.shard_count,
            static_ip: p.static_ip.clone(),
            subnet_id: p.subnet_id.clone(),
            minimum_tls_version: p.minimum_tls_version.clone(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Update body: only the properties Azure allows to change on a running cache
fn cache_update(p: &RedisParameters) -> models::RedisResource {
    let desired = desired_cache(p);
    models::RedisResource {
        tags: desired.tags,
        properties: models::RedisProperties {
            sku: desired.properties.sku,
            enable_non_ssl_port: desired.properties.enable_non_ssl_port,
            redis_configuration: desired.properties.redis_configuration,
            shard_count: desired.properties.shard_count,
            minimum_tls_version: desired.properties.minimum_tls_version,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Whether the observed cache matches the parameters
///
/// Only configuration keys set in the spec are compared; Azure fills in the
/// rest with its own defaults.
pub fn cache_up_to_date(p: &RedisParameters, cache: &models::RedisResource) -> bool {
    let props = &cache.properties;
    let sku_matches = props.sku.as_ref().is_some_and(|sku| {
        sku.name.eq_ignore_ascii_case(sku_name(p.sku.name))
            && sku.family.eq_ignore_ascii_case(sku_family(p.sku.family))
            && sku.capacity == p.sku.capacity
    });
    let configuration_matches = p.redis_configuration.iter().all(|(key, value)| {
        match props.redis_configuration.get(key) {
            Some(Value::String(observed)) => observed == value,
            Some(observed) => observed.to_string() == *value,
            None => false,
        }
    });

    sku_matches
        && configuration_matches
        && props.enable_non_ssl_port.unwrap_or(false) == p.enable_non_ssl_port
        && optional_matches(p.shard_count.as_ref(), props.shard_count.as_ref())
        && optional_matches(p.minimum_tls_version.as_ref(), props.minimum_tls_version.as_ref())
        && cache.tags == p.tags
}

#[async_trait::async_trait]
impl ExternalClient<Redis> for RedisClient {
    async fn observe(&self, cr: &Redis) -> Result<ExternalObservation<RedisObservation>, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let Some(cache) = found(self.azure.get_redis(rg, &name).await)? else {
            return Ok(ExternalObservation::missing());
        };

        let props = &cache.properties;
        let state = props.provisioning_state.as_deref();
        let observation = RedisObservation {
            id: cache.id.clone(),
            provisioning_state: state.map(str::to_string),
            host_name: props.host_name.clone(),
            port: props.port,
            ssl_port: props.ssl_port,
            redis_version: props.redis_version.clone(),
        };
        let mut result = ExternalObservation::exists(
            observation,
            ready_from_provisioning_state(state),
            cache_up_to_date(p, &cache),
        );

        if state == Some(SUCCEEDED) {
            let access_keys = self.azure.list_redis_keys(rg, &name).await?;
            result = result.with_connection_details(details([
                (keys::ENDPOINT, props.host_name.clone()),
                (keys::PORT, props.ssl_port.map(|port| port.to_string())),
                (keys::PASSWORD, Some(access_keys.primary_key)),
            ]));
        }
        Ok(result)
    }

    async fn create(&self, cr: &Redis) -> Result<ExternalCreation, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        self.azure
            .create_redis(rg, &external_name(cr), &desired_cache(p))
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &Redis) -> Result<ExternalUpdate, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);

        // Azure rejects updates while the cache is provisioning or scaling
        let cache = self.azure.get_redis(rg, &name).await?;
        if cache.properties.provisioning_state.as_deref() != Some(SUCCEEDED) {
            info!(
                "Redis {} is {:?}, postponing update",
                name, cache.properties.provisioning_state
            );
            return Ok(ExternalUpdate::default());
        }

        self.azure.update_redis(rg, &name, &cache_update(p)).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &Redis) -> Result<(), ControllerError> {
        let rg = required(cr.spec.for_provider.resource_group_name.as_deref(), "resourceGroupName")?;
        ignore_not_found(self.azure.delete_redis(rg, &external_name(cr)).await)?;
        Ok(())
    }
}
