//! Storage account reconciler
//!
//! Handles: Account

use crate::connection::details;
use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
};
use crate::reconcile_helpers::{
    eq_ignore_case, external_name, found, optional_matches, ready_from_provisioning_state, required,
};
use crate::references::{Resolved, Resolver};
use azure_client::error::ignore_not_found;
use azure_client::{AzureClientTrait, models};
use crds::{
    AccessTier, Account, AccountObservation, AccountParameters, ResourceGroup, StorageEndpoints, StorageKind,
    validate_account_name,
};
use std::sync::Arc;

/// Connection secret keys of a storage account
pub mod storage_keys {
    pub const ACCOUNT_NAME: &str = "accountName";
    pub const ACCOUNT_KEY: &str = "accountKey";
    pub const BLOB_ENDPOINT: &str = "blobEndpoint";
    pub const CONNECTION_STRING: &str = "connectionString";
}

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

#[async_trait::async_trait]
impl ManagedKind for Account {
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

    fn external(ctx: ExternalContext<AccountObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(AccountClient { azure: ctx.azure })
    }
}

pub(crate) struct AccountClient {
    azure: Arc<dyn AzureClientTrait>,
}

fn kind_name(kind: StorageKind) -> &'static str {
    match kind {
        StorageKind::Storage => "Storage",
        StorageKind::StorageV2 => "StorageV2",
        StorageKind::BlobStorage => "BlobStorage",
        StorageKind::BlockBlobStorage => "BlockBlobStorage",
        StorageKind::FileStorage => "FileStorage",
    }
}

fn tier_name(tier: AccessTier) -> &'static str {
    match tier {
        AccessTier::Hot => "Hot",
        AccessTier::Cool => "Cool",
    }
}

fn desired_properties(p: &AccountParameters) -> models::StorageAccountProperties {
    models::StorageAccountProperties {
        access_tier: p.access_tier.map(|t| tier_name(t).to_string()),
        supports_https_traffic_only: Some(p.enable_https_traffic_only),
        minimum_tls_version: p.minimum_tls_version.clone(),
        allow_blob_public_access: p.allow_blob_public_access,
        ..Default::default()
    }
}

/// Create body for an account
pub fn desired_account(p: &AccountParameters) -> models::StorageAccount {
    models::StorageAccount {
        location: p.location.clone(),
        kind: Some(kind_name(p.kind).to_string()),
        sku: Some(models::StorageSku {
            name: p.sku_name.clone(),
            tier: None,
        }),
        tags: p.tags.clone(),
        properties: desired_properties(p),
        ..Default::default()
    }
}

/// Whether the observed account matches the parameters
pub fn account_up_to_date(p: &AccountParameters, account: &models::StorageAccount) -> bool {
    let props = &account.properties;
    let tier = p.access_tier.map(|t| tier_name(t).to_string());
    account
        .sku
        .as_ref()
        .is_some_and(|sku| sku.name.eq_ignore_ascii_case(&p.sku_name))
        && optional_matches(tier.as_ref(), props.access_tier.as_ref())
        && props.supports_https_traffic_only.unwrap_or(true) == p.enable_https_traffic_only
        && p
            .minimum_tls_version
            .as_deref()
            .is_none_or(|tls| eq_ignore_case(tls, props.minimum_tls_version.as_deref()))
        && optional_matches(p.allow_blob_public_access.as_ref(), props.allow_blob_public_access.as_ref())
        && account.tags == p.tags
}

/// DNS suffix of the account's endpoints, taken from its blob endpoint
pub fn endpoint_suffix(account_name: &str, blob_endpoint: Option<&str>) -> String {
    blob_endpoint
        .and_then(|url| url.strip_prefix("https://"))
        .and_then(|host| host.strip_prefix(account_name))
        .and_then(|rest| rest.strip_prefix(".blob."))
        .map(|suffix| suffix.trim_end_matches('/').to_string())
        .filter(|suffix| !suffix.is_empty())
        .unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string())
}

fn observation(account: &models::StorageAccount) -> AccountObservation {
    let props = &account.properties;
    AccountObservation {
        id: account.id.clone(),
        provisioning_state: props.provisioning_state.clone(),
        primary_endpoints: props.primary_endpoints.as_ref().map(|e| StorageEndpoints {
            blob: e.blob.clone(),
            queue: e.queue.clone(),
            table: e.table.clone(),
            file: e.file.clone(),
            web: e.web.clone(),
            dfs: e.dfs.clone(),
        }),
        status_of_primary: props.status_of_primary.clone(),
        creation_time: props.creation_time.clone(),
    }
}

#[async_trait::async_trait]
impl ExternalClient<Account> for AccountClient {
    async fn observe(&self, cr: &Account) -> Result<ExternalObservation<AccountObservation>, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let Some(account) = found(self.azure.get_storage_account(rg, &name).await)? else {
            return Ok(ExternalObservation::missing());
        };

        let state = account.properties.provisioning_state.as_deref();
        let mut result = ExternalObservation::exists(
            observation(&account),
            ready_from_provisioning_state(state),
            account_up_to_date(p, &account),
        );

        if state.is_some_and(|s| s.eq_ignore_ascii_case("Succeeded")) {
            let listed = self.azure.list_storage_account_keys(rg, &name).await?;
            let blob = account
                .properties
                .primary_endpoints
                .as_ref()
                .and_then(|e| e.blob.clone());
            let key = listed.keys.into_iter().next().map(|k| k.value);
            let connection_string = key.as_ref().map(|key| {
                format!(
                    "DefaultEndpointsProtocol=https;AccountName={};AccountKey={};EndpointSuffix={}",
                    name,
                    key,
                    endpoint_suffix(&name, blob.as_deref())
                )
            });
            result = result.with_connection_details(details([
                (storage_keys::ACCOUNT_NAME, Some(name.clone())),
                (storage_keys::ACCOUNT_KEY, key),
                (storage_keys::BLOB_ENDPOINT, blob),
                (storage_keys::CONNECTION_STRING, connection_string),
            ]));
        }
        Ok(result)
    }

    async fn create(&self, cr: &Account) -> Result<ExternalCreation, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        validate_account_name(&name)?;
        self.azure
            .create_storage_account(rg, &name, &desired_account(p))
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &Account) -> Result<ExternalUpdate, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let patch = models::StorageAccount {
            sku: Some(models::StorageSku {
                name: p.sku_name.clone(),
                tier: None,
            }),
            tags: p.tags.clone(),
            properties: desired_properties(p),
            ..Default::default()
        };
        self.azure
            .update_storage_account(rg, &external_name(cr), &patch)
            .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &Account) -> Result<(), ControllerError> {
        let rg = required(cr.spec.for_provider.resource_group_name.as_deref(), "resourceGroupName")?;
        ignore_not_found(self.azure.delete_storage_account(rg, &external_name(cr)).await)?;
        Ok(())
    }
}
