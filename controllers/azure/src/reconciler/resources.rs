//! Resource group reconciler
//!
//! Handles: ResourceGroup

use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
};
use crate::reconcile_helpers::{external_name, found, ready_from_provisioning_state};
use azure_client::error::ignore_not_found;
use azure_client::{AzureClientTrait, models};
use crds::{ResourceGroup, ResourceGroupObservation};
use std::sync::Arc;
use tracing::debug;

#[async_trait::async_trait]
impl ManagedKind for ResourceGroup {
    fn external(ctx: ExternalContext<ResourceGroupObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(ResourceGroupClient { azure: ctx.azure })
    }
}

pub(crate) struct ResourceGroupClient {
    azure: Arc<dyn AzureClientTrait>,
}

fn desired(cr: &ResourceGroup) -> models::ResourceGroup {
    models::ResourceGroup {
        location: cr.spec.for_provider.location.clone(),
        tags: cr.spec.for_provider.tags.clone(),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl ExternalClient<ResourceGroup> for ResourceGroupClient {
    async fn observe(
        &self,
        cr: &ResourceGroup,
    ) -> Result<ExternalObservation<ResourceGroupObservation>, ControllerError> {
        let name = external_name(cr);
        let Some(group) = found(self.azure.get_resource_group(&name).await)? else {
            return Ok(ExternalObservation::missing());
        };

        let observation = ResourceGroupObservation {
            id: group.id.clone(),
            provisioning_state: group.provisioning_state().map(str::to_string),
        };
        let up_to_date = group.tags == cr.spec.for_provider.tags;
        debug!("Resource group {} up to date: {}", name, up_to_date);
        Ok(ExternalObservation::exists(
            observation,
            ready_from_provisioning_state(group.provisioning_state()),
            up_to_date,
        ))
    }

    async fn create(&self, cr: &ResourceGroup) -> Result<ExternalCreation, ControllerError> {
        self.azure
            .create_or_update_resource_group(&external_name(cr), &desired(cr))
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &ResourceGroup) -> Result<ExternalUpdate, ControllerError> {
        self.azure
            .create_or_update_resource_group(&external_name(cr), &desired(cr))
            .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &ResourceGroup) -> Result<(), ControllerError> {
        ignore_not_found(self.azure.delete_resource_group(&external_name(cr)).await)?;
        Ok(())
    }
}
