//! Reconciliation of Azure managed resources.
//!
//! This module is organized by Azure service family:
//! - `resources`: resource groups
//! - `network`: virtual networks and subnets
//! - `cache`: Azure Cache for Redis
//! - `storage`: storage accounts
//! - `dns`: DNS zones
//! - `database`: MySQL/PostgreSQL servers, firewall and virtual network rules
//! - `devices`: IoT Hub routing endpoints
//! - `compute`: AKS clusters
//!
//! Each family implements [`ManagedKind`](crate::managed::ManagedKind) for its
//! CRDs; the shared driver in [`crate::managed`] does the rest.

pub mod cache;
pub mod compute;
pub mod database;
pub mod devices;
pub mod dns;
pub mod network;
pub mod resources;
pub mod storage;

#[cfg(test)]
mod cache_test;
#[cfg(test)]
mod database_test;
#[cfg(test)]
mod devices_test;
#[cfg(test)]
mod dns_test;
#[cfg(test)]
mod network_test;
#[cfg(test)]
mod resources_test;
#[cfg(test)]
mod storage_test;

use crate::backoff::ResourceBackoffs;
use crate::config::Config;
use crate::connection::SecretStore;
use crate::connector::ProviderConnector;
use crate::error::ControllerError;
use crate::managed::{ExternalClient, ExternalContext, KubeStatusRecorder, ManagedKind};
use kube::{Api, Client, Resource, ResourceExt};
use std::sync::Arc;

/// Shared state of all managed resource reconcilers
pub struct Reconciler {
    pub(crate) client: Client,
    pub(crate) connector: ProviderConnector,
    pub(crate) secrets: Arc<dyn SecretStore>,
    pub(crate) config: Config,
    /// Failure backoff per resource (kind/namespace/name)
    pub(crate) backoffs: ResourceBackoffs,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        client: Client,
        connector: ProviderConnector,
        secrets: Arc<dyn SecretStore>,
        config: Config,
    ) -> Self {
        Self {
            client,
            connector,
            secrets,
            config,
            backoffs: ResourceBackoffs::default(),
        }
    }

    /// External client for `cr`, connected through its ProviderConfig
    pub(crate) async fn external_client<K: ManagedKind>(
        &self,
        api: &Api<K>,
        cr: &K,
    ) -> Result<Box<dyn ExternalClient<K>>, ControllerError> {
        let azure = self.connector.connect(cr.provider_config_name()).await?;
        let ctx = ExternalContext {
            azure,
            secrets: Arc::clone(&self.secrets),
            recorder: Arc::new(KubeStatusRecorder::new(api.clone(), cr)?),
            namespace: cr.namespace().unwrap_or_default(),
            owner: cr.controller_owner_ref(&()),
        };
        Ok(K::external(ctx))
    }
}
