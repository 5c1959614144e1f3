//! DNS zone reconciler
//!
//! Handles: DnsZone

use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
};
use crate::reconcile_helpers::{external_name, found, required};
use crate::references::{Resolved, Resolver};
use azure_client::error::ignore_not_found;
use azure_client::{AzureClientTrait, models};
use crds::{Condition, DnsZone, DnsZoneObservation, DnsZoneParameters, ResourceGroup, ZoneType};
use std::sync::Arc;

#[async_trait::async_trait]
impl ManagedKind for DnsZone {
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

    fn external(ctx: ExternalContext<DnsZoneObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(DnsZoneClient { azure: ctx.azure })
    }
}

pub(crate) struct DnsZoneClient {
    azure: Arc<dyn AzureClientTrait>,
}

fn zone_type(zone_type: ZoneType) -> &'static str {
    match zone_type {
        ZoneType::Public => "Public",
        ZoneType::Private => "Private",
    }
}

/// Create body for a zone; DNS zones always live in the "global" location
pub fn desired_zone(p: &DnsZoneParameters) -> models::Zone {
    models::Zone {
        location: models::DNS_ZONE_LOCATION.to_string(),
        tags: p.tags.clone(),
        properties: models::ZoneProperties {
            zone_type: Some(zone_type(p.zone_type).to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl ExternalClient<DnsZone> for DnsZoneClient {
    async fn observe(&self, cr: &DnsZone) -> Result<ExternalObservation<DnsZoneObservation>, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let Some(zone) = found(self.azure.get_dns_zone(rg, &external_name(cr)).await)? else {
            return Ok(ExternalObservation::missing());
        };

        // Zones carry no provisioning state; one that exists is serving
        let up_to_date = zone.tags == p.tags;
        let observation = DnsZoneObservation {
            id: zone.id,
            etag: zone.etag,
            name_servers: zone.properties.name_servers,
            number_of_record_sets: zone.properties.number_of_record_sets,
            max_number_of_record_sets: zone.properties.max_number_of_record_sets,
        };
        Ok(ExternalObservation::exists(observation, Condition::available(), up_to_date))
    }

    async fn create(&self, cr: &DnsZone) -> Result<ExternalCreation, ControllerError> {
        self.put(cr).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &DnsZone) -> Result<ExternalUpdate, ControllerError> {
        self.put(cr).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &DnsZone) -> Result<(), ControllerError> {
        let rg = required(cr.spec.for_provider.resource_group_name.as_deref(), "resourceGroupName")?;
        ignore_not_found(self.azure.delete_dns_zone(rg, &external_name(cr)).await)?;
        Ok(())
    }
}

impl DnsZoneClient {
    async fn put(&self, cr: &DnsZone) -> Result<(), ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        self.azure
            .create_or_update_dns_zone(rg, &external_name(cr), &desired_zone(p))
            .await?;
        Ok(())
    }
}
