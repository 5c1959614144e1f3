//! Connection secrets
//!
//! Managed resources publish endpoints and credentials (hostnames, keys,
//! passwords, kubeconfigs) into the Secret named by
//! `writeConnectionSecretToRef`. Publishing merges into the existing Secret so
//! values only returned once, such as a database password generated at create
//! time, survive later reconciles that do not return them again.

use crate::error::ControllerError;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Key/value pairs written to a connection secret
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// Secret type of connection secrets written by this controller
pub const CONNECTION_SECRET_TYPE: &str = "connection.azure.microscaler.io/v1alpha1";

/// Conventional connection secret keys
pub mod keys {
    pub const ENDPOINT: &str = "endpoint";
    pub const PORT: &str = "port";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const KUBECONFIG: &str = "kubeconfig";
    pub const CLIENT_ID: &str = "clientId";
    pub const CLIENT_SECRET: &str = "clientSecret";
}

/// Read and merge-write Kubernetes Secrets
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Data of the Secret, or `None` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConnectionDetails>, ControllerError>;

    /// Merge `data` into the Secret, creating it (owned by `owner`) if missing
    async fn apply(
        &self,
        namespace: &str,
        name: &str,
        data: &ConnectionDetails,
        owner: Option<OwnerReference>,
    ) -> Result<(), ControllerError>;

    /// A single key of a Secret
    async fn get_key(&self, namespace: &str, name: &str, key: &str) -> Result<Vec<u8>, ControllerError> {
        self.get(namespace, name)
            .await?
            .ok_or_else(|| ControllerError::Secret(format!("secret {namespace}/{name} not found")))?
            .remove(key)
            .ok_or_else(|| ControllerError::Secret(format!("secret {namespace}/{name} has no key {key}")))
    }
}

/// Secrets in the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConnectionDetails>, ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.map(|secret| {
            secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.0))
                .collect()
        }))
    }

    async fn apply(
        &self,
        namespace: &str,
        name: &str,
        data: &ConnectionDetails,
        owner: Option<OwnerReference>,
    ) -> Result<(), ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let encoded: BTreeMap<String, ByteString> = data
            .iter()
            .map(|(k, v)| (k.clone(), ByteString(v.clone())))
            .collect();

        match api.get_opt(name).await? {
            Some(existing) => {
                let current = existing.data.unwrap_or_default();
                if encoded.iter().all(|(k, v)| current.get(k) == Some(v)) {
                    debug!("Secret {}/{} already up to date", namespace, name);
                    return Ok(());
                }
                let patch = serde_json::json!({ "data": encoded });
                api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                info!("Updated secret {}/{}", namespace, name);
            }
            None => {
                let secret = Secret {
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        namespace: Some(namespace.to_string()),
                        owner_references: owner.map(|o| vec![o]),
                        ..Default::default()
                    },
                    type_: Some(CONNECTION_SECRET_TYPE.to_string()),
                    data: Some(encoded),
                    ..Default::default()
                };
                api.create(&PostParams::default(), &secret).await?;
                info!("Created secret {}/{}", namespace, name);
            }
        }
        Ok(())
    }
}

/// Build connection details from string pairs, skipping absent values
pub fn details<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<String>)>) -> ConnectionDetails {
    pairs
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v.into_bytes())))
        .collect()
}

/// Merge `incoming` into `existing`; returns whether anything changed
pub fn merge_details(existing: &mut ConnectionDetails, incoming: &ConnectionDetails) -> bool {
    let mut changed = false;
    for (k, v) in incoming {
        if existing.get(k) != Some(v) {
            existing.insert(k.clone(), v.clone());
            changed = true;
        }
    }
    changed
}
