//! Network reconcilers
//!
//! Handles: VirtualNetwork, Subnet

use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
};
use crate::reconcile_helpers::{external_name, found, ready_from_provisioning_state, required};
use crate::references::{Resolved, Resolver};
use azure_client::error::ignore_not_found;
use azure_client::{AzureClientTrait, models};
use crds::{
    ResourceGroup, Subnet, SubnetObservation, SubnetParameters, VirtualNetwork, VirtualNetworkObservation,
    VirtualNetworkParameters,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

#[async_trait::async_trait]
impl ManagedKind for VirtualNetwork {
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

    fn external(ctx: ExternalContext<VirtualNetworkObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(VirtualNetworkClient { azure: ctx.azure })
    }
}

pub(crate) struct VirtualNetworkClient {
    azure: Arc<dyn AzureClientTrait>,
}

fn desired_vnet(p: &VirtualNetworkParameters) -> models::VirtualNetwork {
    models::VirtualNetwork {
        location: p.location.clone(),
        tags: p.tags.clone(),
        properties: models::VirtualNetworkProperties {
            address_space: Some(models::AddressSpace {
                address_prefixes: p.address_space.address_prefixes.clone(),
            }),
            enable_ddos_protection: Some(p.enable_ddos_protection),
            enable_vm_protection: Some(p.enable_vm_protection),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Whether the observed virtual network matches the parameters
pub fn vnet_up_to_date(p: &VirtualNetworkParameters, vnet: &models::VirtualNetwork) -> bool {
    let prefixes = vnet
        .properties
        .address_space
        .as_ref()
        .map(|a| a.address_prefixes.as_slice())
        .unwrap_or_default();
    prefixes == p.address_space.address_prefixes.as_slice()
        && vnet.properties.enable_ddos_protection.unwrap_or(false) == p.enable_ddos_protection
        && vnet.properties.enable_vm_protection.unwrap_or(false) == p.enable_vm_protection
        && vnet.tags == p.tags
}

#[async_trait::async_trait]
impl ExternalClient<VirtualNetwork> for VirtualNetworkClient {
    async fn observe(
        &self,
        cr: &VirtualNetwork,
    ) -> Result<ExternalObservation<VirtualNetworkObservation>, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let Some(vnet) = found(self.azure.get_virtual_network(rg, &external_name(cr)).await)? else {
            return Ok(ExternalObservation::missing());
        };

        let state = vnet.properties.provisioning_state.as_deref();
        let observation = VirtualNetworkObservation {
            id: vnet.id.clone(),
            etag: vnet.etag.clone(),
            resource_guid: vnet.properties.resource_guid.clone(),
            provisioning_state: state.map(str::to_string),
            r#type: vnet.r#type.clone(),
        };
        Ok(ExternalObservation::exists(
            observation,
            ready_from_provisioning_state(state),
            vnet_up_to_date(p, &vnet),
        ))
    }

    async fn create(&self, cr: &VirtualNetwork) -> Result<ExternalCreation, ControllerError> {
        self.put(cr, None).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &VirtualNetwork) -> Result<ExternalUpdate, ControllerError> {
        let rg = required(cr.spec.for_provider.resource_group_name.as_deref(), "resourceGroupName")?;
        // Subnets are managed as their own resources; keep whatever is attached
        let subnets = found(self.azure.get_virtual_network(rg, &external_name(cr)).await)?
            .and_then(|current| current.properties.subnets);
        self.put(cr, subnets).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &VirtualNetwork) -> Result<(), ControllerError> {
        let rg = required(cr.spec.for_provider.resource_group_name.as_deref(), "resourceGroupName")?;
        ignore_not_found(self.azure.delete_virtual_network(rg, &external_name(cr)).await)?;
        Ok(())
    }
}

impl VirtualNetworkClient {
    async fn put(&self, cr: &VirtualNetwork, subnets: Option<Vec<Value>>) -> Result<(), ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let mut vnet = desired_vnet(p);
        vnet.properties.subnets = subnets;
        self.azure
            .create_or_update_virtual_network(rg, &external_name(cr), &vnet)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ManagedKind for Subnet {
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
        resolver
            .name::<VirtualNetwork>(
                &mut resolved,
                "virtualNetworkName",
                p.virtual_network_name.as_deref(),
                p.virtual_network_name_ref.as_ref(),
            )
            .await?;
        Ok(resolved)
    }

    fn external(ctx: ExternalContext<SubnetObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(SubnetClient { azure: ctx.azure })
    }
}

pub(crate) struct SubnetClient {
    azure: Arc<dyn AzureClientTrait>,
}

fn desired_subnet(p: &SubnetParameters) -> models::Subnet {
    models::Subnet {
        properties: models::SubnetProperties {
            address_prefix: Some(p.address_prefix.clone()),
            service_endpoints: p
                .service_endpoints
                .iter()
                .map(|e| models::ServiceEndpoint {
                    service: e.service.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Whether the observed subnet matches the parameters
///
/// Service endpoints are compared as a set of service names.
pub fn subnet_up_to_date(p: &SubnetParameters, subnet: &models::Subnet) -> bool {
    let desired: BTreeSet<&str> = p.service_endpoints.iter().map(|e| e.service.as_str()).collect();
    let observed: BTreeSet<&str> = subnet
        .properties
        .service_endpoints
        .iter()
        .map(|e| e.service.as_str())
        .collect();
    subnet.properties.address_prefix.as_deref() == Some(p.address_prefix.as_str()) && desired == observed
}

fn subnet_location(p: &SubnetParameters) -> Result<(&str, &str), ControllerError> {
    Ok((
        required(p.resource_group_name.as_deref(), "resourceGroupName")?,
        required(p.virtual_network_name.as_deref(), "virtualNetworkName")?,
    ))
}

#[async_trait::async_trait]
impl ExternalClient<Subnet> for SubnetClient {
    async fn observe(&self, cr: &Subnet) -> Result<ExternalObservation<SubnetObservation>, ControllerError> {
        let p = &cr.spec.for_provider;
        let (rg, vnet) = subnet_location(p)?;
        let Some(subnet) = found(self.azure.get_subnet(rg, vnet, &external_name(cr)).await)? else {
            return Ok(ExternalObservation::missing());
        };

        let state = subnet.properties.provisioning_state.as_deref();
        let observation = SubnetObservation {
            id: subnet.id.clone(),
            etag: subnet.etag.clone(),
            provisioning_state: state.map(str::to_string),
            purpose: subnet.properties.purpose.clone(),
        };
        Ok(ExternalObservation::exists(
            observation,
            ready_from_provisioning_state(state),
            subnet_up_to_date(p, &subnet),
        ))
    }

    async fn create(&self, cr: &Subnet) -> Result<ExternalCreation, ControllerError> {
        self.put(cr).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &Subnet) -> Result<ExternalUpdate, ControllerError> {
        self.put(cr).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &Subnet) -> Result<(), ControllerError> {
        let (rg, vnet) = subnet_location(&cr.spec.for_provider)?;
        ignore_not_found(self.azure.delete_subnet(rg, vnet, &external_name(cr)).await)?;
        Ok(())
    }
}

impl SubnetClient {
    async fn put(&self, cr: &Subnet) -> Result<(), ControllerError> {
        let p = &cr.spec.for_provider;
        let (rg, vnet) = subnet_location(p)?;
        self.azure
            .create_or_update_subnet(rg, vnet, &external_name(cr), &desired_subnet(p))
            .await?;
        Ok(())
    }
}
