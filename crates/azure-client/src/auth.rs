//! Credential construction
//!
//! Tokens are obtained from `azure_identity` credentials. Three sources are
//! supported: a service principal secret (the JSON printed by
//! `az ad sp create-for-rbac --sdk-auth`), workload identity federation and
//! the managed identity of the node or pod.

use crate::error::AzureError;
use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::{
    ClientSecretCredential, ManagedIdentityCredential, WorkloadIdentityCredential,
    WorkloadIdentityCredentialOptions,
};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Service principal credentials as printed by `az ad sp create-for-rbac --sdk-auth`
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub active_directory_endpoint_url: Option<String>,
    #[serde(default)]
    pub resource_manager_endpoint_url: Option<String>,
    #[serde(default)]
    pub active_directory_graph_resource_id: Option<String>,
}

impl fmt::Debug for SdkAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkAuthCredentials")
            .field("client_id", &self.client_id)
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

impl SdkAuthCredentials {
    /// Parse the `--sdk-auth` JSON document
    pub fn parse(data: &[u8]) -> Result<Self, AzureError> {
        serde_json::from_slice(data).map_err(|e| {
            AzureError::InvalidRequest(format!("cannot parse service principal credentials: {e}"))
        })
    }
}

/// Where to obtain tokens from
#[derive(Clone)]
pub enum CredentialSource {
    /// Service principal with a client secret
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// Federated token projected into the pod
    WorkloadIdentity { client_id: String },
    /// Managed identity of the host
    ManagedIdentity,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::ClientSecret { tenant_id, client_id, .. } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            CredentialSource::WorkloadIdentity { client_id } => f
                .debug_struct("WorkloadIdentity")
                .field("client_id", client_id)
                .finish(),
            CredentialSource::ManagedIdentity => write!(f, "ManagedIdentity"),
        }
    }
}

impl From<&SdkAuthCredentials> for CredentialSource {
    fn from(creds: &SdkAuthCredentials) -> Self {
        CredentialSource::ClientSecret {
            tenant_id: creds.tenant_id.clone(),
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
        }
    }
}

/// Build a token credential for the given source
pub fn build_credential(source: &CredentialSource) -> Result<Arc<dyn TokenCredential>, AzureError> {
    let credential: Arc<dyn TokenCredential> = match source {
        CredentialSource::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => {
            info!("Using service principal authentication with client ID: {}", client_id);
            ClientSecretCredential::new(
                tenant_id,
                client_id.clone(),
                Secret::new(client_secret.clone()),
                None,
            )
            .map_err(|e| AzureError::Authentication(format!("ClientSecretCredential: {e}")))?
        }
        CredentialSource::WorkloadIdentity { client_id } => {
            info!("Using Azure Workload Identity authentication with client ID: {}", client_id);
            let options = WorkloadIdentityCredentialOptions {
                client_id: Some(client_id.clone()),
                ..Default::default()
            };
            WorkloadIdentityCredential::new(Some(options))
                .map_err(|e| AzureError::Authentication(format!("WorkloadIdentityCredential: {e}")))?
        }
        CredentialSource::ManagedIdentity => {
            info!("Using Managed Identity authentication");
            ManagedIdentityCredential::new(None)
                .map_err(|e| AzureError::Authentication(format!("ManagedIdentityCredential: {e}")))?
        }
    };
    Ok(credential)
}

/// Credential returning a fixed token, for tests against local servers
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug)]
pub struct StaticTokenCredential;

#[cfg(any(test, feature = "test-util"))]
#[async_trait::async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<azure_core::credentials::TokenRequestOptions<'_>>,
    ) -> azure_core::Result<azure_core::credentials::AccessToken> {
        use typespec_client_core::time::{Duration, OffsetDateTime};

        Ok(azure_core::credentials::AccessToken::new(
            Secret::new("test-token".to_string()),
            OffsetDateTime::now_utc() + Duration::seconds(3600),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sdk_auth() {
        let json = br#"{
            "clientId": "c",
            "clientSecret": "s",
            "subscriptionId": "sub",
            "tenantId": "t",
            "activeDirectoryEndpointUrl": "https://login.microsoftonline.com",
            "resourceManagerEndpointUrl": "https://management.azure.com/",
            "activeDirectoryGraphResourceId": "https://graph.windows.net/",
            "sqlManagementEndpointUrl": "https://management.core.windows.net:8443/"
        }"#;
        let creds = SdkAuthCredentials::parse(json).unwrap();
        assert_eq!(creds.subscription_id, "sub");
        assert_eq!(
            creds.resource_manager_endpoint_url.as_deref(),
            Some("https://management.azure.com/")
        );
        let debug = format!("{creds:?}");
        assert!(!debug.contains("\"s\""));
    }

    #[test]
    fn test_parse_sdk_auth_missing_field() {
        let err = SdkAuthCredentials::parse(br#"{"clientId": "c"}"#).unwrap_err();
        assert!(matches!(err, AzureError::InvalidRequest(_)));
    }

    #[test]
    fn test_credential_source_debug_hides_secret() {
        let source = CredentialSource::ClientSecret {
            tenant_id: "t".into(),
            client_id: "c".into(),
            client_secret: "hunter2".into(),
        };
        assert!(!format!("{source:?}").contains("hunter2"));
    }
}
