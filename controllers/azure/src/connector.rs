//! Azure connections from ProviderConfigs
//!
//! Each managed resource names a cluster-scoped `ProviderConfig`. The
//! connector reads it (and its credentials Secret), builds an [`AzureClient`]
//! and caches it per ProviderConfig name until the ProviderConfig's
//! resourceVersion changes.

use crate::connection::SecretStore;
use crate::error::ControllerError;
use azure_client::auth::{CredentialSource, SdkAuthCredentials, build_credential};
use azure_client::{AzureClient, AzureClientTrait, AzureEndpoints};
use crds::{CredentialsSource, ProviderConfig, ProviderConfigSpec};
use kube::{Api, Client, ResourceExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Everything needed to build an Azure client
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub source: CredentialSource,
    pub subscription_id: String,
    pub endpoints: AzureEndpoints,
}

/// Derive connection settings from a ProviderConfig spec
///
/// `secret` is the credentials document for the `Secret` source. Its
/// subscription is used unless the spec sets one, and its
/// `resourceManagerEndpointUrl` overrides the default management endpoint.
pub fn connection_settings(
    spec: &ProviderConfigSpec,
    secret: Option<&[u8]>,
    defaults: &AzureEndpoints,
) -> Result<ConnectionSettings, ControllerError> {
    let mut endpoints = defaults.clone();
    let subscription = spec.subscription_id.clone().filter(|s| !s.is_empty());

    let (source, subscription_id) = match spec.credentials.source {
        CredentialsSource::Secret => {
            let data = secret.ok_or_else(|| {
                ControllerError::ProviderConfig("credentials secret is required for source Secret".to_string())
            })?;
            let creds = SdkAuthCredentials::parse(data)?;
            if let Some(url) = creds.resource_manager_endpoint_url.as_deref().filter(|u| !u.is_empty()) {
                endpoints.management = url.trim_end_matches('/').to_string();
            }
            let subscription_id = subscription.unwrap_or_else(|| creds.subscription_id.clone());
            (CredentialSource::from(&creds), subscription_id)
        }
        CredentialsSource::WorkloadIdentity => {
            let client_id = spec
                .credentials
                .client_id
                .clone()
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    ControllerError::ProviderConfig("clientId is required for source WorkloadIdentity".to_string())
                })?;
            (
                CredentialSource::WorkloadIdentity { client_id },
                require_subscription(subscription)?,
            )
        }
        CredentialsSource::InjectedIdentity => (
            CredentialSource::ManagedIdentity,
            require_subscription(subscription)?,
        ),
    };

    Ok(ConnectionSettings {
        source,
        subscription_id,
        endpoints,
    })
}

fn require_subscription(subscription: Option<String>) -> Result<String, ControllerError> {
    subscription.ok_or_else(|| {
        ControllerError::ProviderConfig("subscriptionId is required for identity-based credentials".to_string())
    })
}

/// Builds and caches Azure clients per ProviderConfig
pub struct ProviderConnector {
    api: Api<ProviderConfig>,
    secrets: Arc<dyn SecretStore>,
    endpoints: AzureEndpoints,
    cache: Mutex<HashMap<String, (String, Arc<dyn AzureClientTrait>)>>,
}

impl std::fmt::Debug for ProviderConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConnector")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl ProviderConnector {
    pub fn new(client: Client, secrets: Arc<dyn SecretStore>, endpoints: AzureEndpoints) -> Self {
        Self {
            api: Api::all(client),
            secrets,
            endpoints,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Azure client for the named ProviderConfig
    pub async fn connect(&self, name: &str) -> Result<Arc<dyn AzureClientTrait>, ControllerError> {
        let config = self
            .api
            .get_opt(name)
            .await?
            .ok_or_else(|| ControllerError::ProviderConfig(format!("ProviderConfig {name} not found")))?;
        let version = config.resource_version().unwrap_or_default();

        if let Some(client) = self.cached(name, &version) {
            return Ok(client);
        }

        let secret = match (&config.spec.credentials.source, &config.spec.credentials.secret_ref) {
            (CredentialsSource::Secret, Some(secret_ref)) => Some(
                self.secrets
                    .get_key(&secret_ref.namespace, &secret_ref.name, &secret_ref.key)
                    .await?,
            ),
            _ => None,
        };

        let settings = connection_settings(&config.spec, secret.as_deref(), &self.endpoints)?;
        info!(
            "Connecting ProviderConfig {} to subscription {} via {:?}",
            name, settings.subscription_id, settings.source
        );
        let credential = build_credential(&settings.source)?;
        let client: Arc<dyn AzureClientTrait> = Arc::new(AzureClient::new(
            credential,
            settings.subscription_id,
            &settings.endpoints,
        )?);

        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(name.to_string(), (version, Arc::clone(&client)));
        Ok(client)
    }

    fn cached(&self, name: &str, version: &str) -> Option<Arc<dyn AzureClientTrait>> {
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        match cache.get(name) {
            Some((cached_version, client)) if cached_version == version => {
                debug!("Reusing Azure client for ProviderConfig {}", name);
                Some(Arc::clone(client))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{CredentialsSecretRef, ProviderCredentials};

    const SDK_AUTH: &str = r#"{
        "clientId": "cid",
        "clientSecret": "shh",
        "subscriptionId": "sub-from-secret",
        "tenantId": "tid",
        "resourceManagerEndpointUrl": "https://management.usgovcloudapi.net/"
    }"#;

    fn spec(source: CredentialsSource) -> ProviderConfigSpec {
        ProviderConfigSpec {
            credentials: ProviderCredentials {
                source,
                secret_ref: Some(CredentialsSecretRef {
                    namespace: "crossplane-system".to_string(),
                    name: "azure-creds".to_string(),
                    key: "credentials".to_string(),
                }),
                client_id: None,
            },
            subscription_id: None,
            tenant_id: None,
        }
    }

    #[test]
    fn test_secret_source() {
        let settings = connection_settings(
            &spec(CredentialsSource::Secret),
            Some(SDK_AUTH.as_bytes()),
            &AzureEndpoints::default(),
        )
        .unwrap();

        assert_eq!(settings.subscription_id, "sub-from-secret");
        assert_eq!(settings.endpoints.management, "https://management.usgovcloudapi.net");
        assert_eq!(settings.endpoints.graph, AzureEndpoints::default().graph);
        assert!(matches!(
            settings.source,
            CredentialSource::ClientSecret { ref client_id, .. } if client_id == "cid"
        ));
    }

    #[test]
    fn test_spec_subscription_overrides_secret() {
        let mut spec = spec(CredentialsSource::Secret);
        spec.subscription_id = Some("sub-from-spec".to_string());
        let settings =
            connection_settings(&spec, Some(SDK_AUTH.as_bytes()), &AzureEndpoints::default()).unwrap();
        assert_eq!(settings.subscription_id, "sub-from-spec");
    }

    #[test]
    fn test_secret_source_requires_secret() {
        let err = connection_settings(&spec(CredentialsSource::Secret), None, &AzureEndpoints::default())
            .unwrap_err();
        assert!(matches!(err, ControllerError::ProviderConfig(_)));

        let err = connection_settings(
            &spec(CredentialsSource::Secret),
            Some(b"not json"),
            &AzureEndpoints::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ControllerError::Azure(_)));
    }

    #[test]
    fn test_workload_identity() {
        let mut spec = spec(CredentialsSource::WorkloadIdentity);
        spec.subscription_id = Some("sub".to_string());
        assert!(connection_settings(&spec, None, &AzureEndpoints::default()).is_err());

        spec.credentials.client_id = Some("wi-client".to_string());
        let settings = connection_settings(&spec, None, &AzureEndpoints::default()).unwrap();
        assert!(matches!(
            settings.source,
            CredentialSource::WorkloadIdentity { ref client_id } if client_id == "wi-client"
        ));
    }

    #[test]
    fn test_injected_identity_needs_subscription() {
        let mut spec = spec(CredentialsSource::InjectedIdentity);
        assert!(connection_settings(&spec, None, &AzureEndpoints::default()).is_err());

        spec.subscription_id = Some("sub".to_string());
        let settings = connection_settings(&spec, None, &AzureEndpoints::default()).unwrap();
        assert!(matches!(settings.source, CredentialSource::ManagedIdentity));
        assert_eq!(settings.subscription_id, "sub");
    }
}
