//! Main controller implementation.
//!
//! Starts one watcher per managed kind and returns when any of them stops.

use crate::config::Config;
use crate::connection::{KubeSecretStore, SecretStore};
use crate::connector::ProviderConnector;
use crate::error::ControllerError;
use crate::managed::ManagedKind;
use crate::reconciler::Reconciler;
use crate::watcher::watch_resource;
use crds::{
    AKSCluster, Account, DnsZone, IotHubEndpoint, MySQLServer, MySQLServerFirewallRule,
    MySQLServerVirtualNetworkRule, PostgreSQLServer, PostgreSQLServerFirewallRule,
    PostgreSQLServerVirtualNetworkRule, Redis, ResourceGroup, Subnet, VirtualNetwork,
};
use futures::future::select_all;
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

type WatcherHandle = (&'static str, JoinHandle<Result<(), ControllerError>>);

/// Runs the watchers of every Azure kind
pub struct Controller {
    watchers: Vec<WatcherHandle>,
}

fn spawn<K: ManagedKind>(name: &'static str, reconciler: &Arc<Reconciler>) -> WatcherHandle {
    let reconciler = Arc::clone(reconciler);
    (name, tokio::spawn(watch_resource::<K>(reconciler)))
}

impl Controller {
    /// Connect to Kubernetes and start the watchers
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Azure provider controller");

        let client = Client::try_default().await?;
        let secrets: Arc<dyn SecretStore> = Arc::new(KubeSecretStore::new(client.clone()));
        let connector = ProviderConnector::new(client.clone(), Arc::clone(&secrets), config.endpoints.clone());
        let reconciler = Arc::new(Reconciler::new(client, connector, secrets, config));

        let watchers = vec![
            spawn::<ResourceGroup>("ResourceGroup", &reconciler),
            spawn::<VirtualNetwork>("VirtualNetwork", &reconciler),
            spawn::<Subnet>("Subnet", &reconciler),
            spawn::<Redis>("Redis", &reconciler),
            spawn::<Account>("Account", &reconciler),
            spawn::<DnsZone>("DnsZone", &reconciler),
            spawn::<MySQLServer>("MySQLServer", &reconciler),
            spawn::<MySQLServerFirewallRule>("MySQLServerFirewallRule", &reconciler),
            spawn::<MySQLServerVirtualNetworkRule>("MySQLServerVirtualNetworkRule", &reconciler),
            spawn::<PostgreSQLServer>("PostgreSQLServer", &reconciler),
            spawn::<PostgreSQLServerFirewallRule>("PostgreSQLServerFirewallRule", &reconciler),
            spawn::<PostgreSQLServerVirtualNetworkRule>("PostgreSQLServerVirtualNetworkRule", &reconciler),
            spawn::<IotHubEndpoint>("IotHubEndpoint", &reconciler),
            spawn::<AKSCluster>("AKSCluster", &reconciler),
        ];
        info!("Started {} watchers", watchers.len());

        Ok(Self { watchers })
    }

    /// Runs until a watcher exits, which is always an error
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Azure provider controller running");

        let (names, handles): (Vec<_>, Vec<_>) = self.watchers.into_iter().unzip();
        let (result, index, remaining) = select_all(handles).await;
        for handle in remaining {
            handle.abort();
        }

        let name = names[index];
        error!("{} watcher exited", name);
        result.map_err(|e| ControllerError::Watch(format!("{name} watcher panicked: {e}")))?
    }
}
