//! AKS cluster reconciler
//!
//! Handles: AKSCluster
//!
//! A cluster needs an AD application, its service principal and (when it
//! joins an existing subnet) a Network Contributor role assignment before the
//! managed cluster itself can be created. Each step is recorded in
//! `status.atProvider` as soon as it completes so an interrupted create
//! resumes instead of leaking AD objects. Cluster create, update and delete
//! are long-running; the operation token is recorded too and polled by
//! `observe`.

use crate::connection::{ConnectionDetails, SecretStore, details, keys};
use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
    StatusRecorder,
};
use crate::reconcile_helpers::{external_name, found, ready_from_provisioning_state, required};
use crate::references::{Resolved, Resolver};
use azure_client::error::ignore_not_found;
use azure_client::retry::{RetryConfig, retry_with_backoff};
use azure_client::{AzureClientTrait, AzureError, OperationStatus, PollerToken, ids, models};
use base64::Engine;
use crds::{AKSCluster, AKSClusterObservation, AKSClusterParameters, Condition, ResourceGroup};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Name of the single system node pool
pub const AGENT_POOL_NAME: &str = "agentpool";

/// Display name of the password credential added to the AD application
const PASSWORD_DISPLAY_NAME: &str = "azure-provider";

const STATE_SUCCEEDED: &str = "Succeeded";
const STATE_FAILED: &str = "Failed";
const STATE_DELETING: &str = "Deleting";

#[async_trait::async_trait]
impl ManagedKind for AKSCluster {
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
            .subnet_id(
                &mut resolved,
                "vnetSubnetId",
                p.vnet_subnet_id.as_deref(),
                p.vnet_subnet_id_ref.as_ref(),
            )
            .await?;
        Ok(resolved)
    }

    fn external(ctx: ExternalContext<AKSClusterObservation>) -> Box<dyn ExternalClient<Self>> {
        Box::new(AksClusterClient::new(ctx, RetryConfig::default()))
    }
}

pub(crate) struct AksClusterClient {
    azure: Arc<dyn AzureClientTrait>,
    secrets: Arc<dyn SecretStore>,
    recorder: Arc<dyn StatusRecorder<AKSClusterObservation>>,
    namespace: String,
    owner: Option<OwnerReference>,
    retry: RetryConfig,
    /// Latest recorded progress, newer than the resource's status once set
    progress: Mutex<Option<AKSClusterObservation>>,
}

/// Managed cluster body for a create or re-create
pub fn desired_cluster(
    p: &AKSClusterParameters,
    name: &str,
    client_id: &str,
    client_secret: &str,
) -> models::ManagedCluster {
    models::ManagedCluster {
        location: p.location.clone(),
        properties: models::ManagedClusterProperties {
            kubernetes_version: Some(p.version.clone()),
            dns_prefix: Some(p.dns_name_prefix.clone().unwrap_or_else(|| name.to_string())),
            enable_rbac: Some(!p.disable_rbac),
            agent_pool_profiles: vec![models::AgentPoolProfile {
                name: AGENT_POOL_NAME.to_string(),
                count: Some(p.node_count()),
                vm_size: Some(p.node_vm_size().to_string()),
                os_type: Some("Linux".to_string()),
                mode: Some("System".to_string()),
                vnet_subnet_id: p.vnet_subnet_id.clone(),
            }],
            service_principal_profile: Some(models::ServicePrincipalProfile {
                client_id: client_id.to_string(),
                secret: Some(client_secret.to_string()),
            }),
            network_profile: p.vnet_subnet_id.as_ref().map(|_| models::NetworkProfile {
                network_plugin: Some("azure".to_string()),
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Node count of the cluster's system pool
pub fn observed_node_count(cluster: &models::ManagedCluster) -> Option<i32> {
    let profiles = &cluster.properties.agent_pool_profiles;
    profiles
        .iter()
        .find(|p| p.name == AGENT_POOL_NAME)
        .or_else(|| profiles.first())
        .and_then(|p| p.count)
}

/// Whether the resource still has something in Azure
///
/// While the resource is being deleted the AD objects outlive the cluster, so
/// the resource keeps existing until every recorded object is gone.
pub fn still_exists(cluster_present: bool, deleting: bool, progress: &AKSClusterObservation) -> bool {
    cluster_present
        || (deleting
            && (progress.application_object_id.is_some()
                || progress.service_principal_id.is_some()
                || progress.role_assignment_name.is_some()))
}

/// A field Azure is expected to fill in on every response
fn returned(value: Option<String>, field: &str) -> Result<String, ControllerError> {
    value.ok_or_else(|| AzureError::InvalidRequest(format!("Azure returned no {field}")).into())
}

fn token_string(token: Option<PollerToken>) -> Result<Option<String>, ControllerError> {
    Ok(token.map(|t| t.to_token_string()).transpose()?)
}

impl AksClusterClient {
    pub(crate) fn new(ctx: ExternalContext<AKSClusterObservation>, retry: RetryConfig) -> Self {
        Self {
            azure: ctx.azure,
            secrets: ctx.secrets,
            recorder: ctx.recorder,
            namespace: ctx.namespace,
            owner: ctx.owner,
            retry,
            progress: Mutex::new(None),
        }
    }

    fn progress(&self, cr: &AKSCluster) -> AKSClusterObservation {
        let latest = self.progress.lock().unwrap_or_else(|p| p.into_inner()).clone();
        latest.unwrap_or_else(|| cr.status.as_ref().and_then(|s| s.at_provider.clone()).unwrap_or_default())
    }

    async fn save(&self, progress: &AKSClusterObservation) -> Result<(), ControllerError> {
        self.recorder.record(progress).await?;
        *self.progress.lock().unwrap_or_else(|p| p.into_inner()) = Some(progress.clone());
        Ok(())
    }

    fn secret_location<'a>(&'a self, p: &'a AKSClusterParameters) -> (&'a str, &'a str) {
        let target = &p.write_service_principal_secret_to;
        (target.namespace.as_deref().unwrap_or(&self.namespace), target.name.as_str())
    }

    /// Poll a recorded operation; returns whether it is still running
    async fn poll_running_operation(&self, progress: &mut AKSClusterObservation) -> Result<bool, ControllerError> {
        let Some(token) = progress.running_operation.clone() else {
            return Ok(false);
        };
        let poller = PollerToken::from_token_string(&token)?;
        match self.azure.poll_operation(&poller).await {
            Ok(OperationStatus::InProgress) => Ok(true),
            Ok(OperationStatus::Succeeded) => {
                debug!("Cluster operation finished");
                progress.running_operation = None;
                self.save(progress).await?;
                Ok(false)
            }
            Ok(OperationStatus::Failed(message)) => {
                progress.running_operation = None;
                self.save(progress).await?;
                Err(AzureError::OperationFailed(message).into())
            }
            Err(e) if e.is_not_found() => {
                warn!("Recorded cluster operation no longer exists, forgetting it");
                progress.running_operation = None;
                self.save(progress).await?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find or create the AD application and make sure its secret is stored
    ///
    /// Returns the application (client) id and secret.
    async fn ensure_application(
        &self,
        p: &AKSClusterParameters,
        name: &str,
        progress: &mut AKSClusterObservation,
    ) -> Result<(String, String), ControllerError> {
        let mut application = match &progress.application_object_id {
            Some(object_id) => found(self.azure.get_application(object_id).await)?,
            None => None,
        };
        if application.is_none() {
            application = self.azure.find_application_by_display_name(name).await?;
        }
        let (application, created) = match application {
            Some(application) => (application, false),
            None => {
                info!("Creating AD application {}", name);
                let request = models::Application {
                    display_name: name.to_string(),
                    ..Default::default()
                };
                (self.azure.create_application(&request).await?, true)
            }
        };

        let object_id = returned(application.id, "application id")?;
        let app_id = returned(application.app_id, "application appId")?;
        if progress.application_object_id.as_deref() != Some(object_id.as_str())
            || progress.application_id.as_deref() != Some(app_id.as_str())
        {
            progress.application_object_id = Some(object_id.clone());
            progress.application_id = Some(app_id.clone());
            self.save(progress).await?;
        }

        let (namespace, secret_name) = self.secret_location(p);
        let stored = self
            .secrets
            .get(namespace, secret_name)
            .await?
            .and_then(|mut data| data.remove(keys::CLIENT_SECRET))
            .and_then(|secret| String::from_utf8(secret).ok());
        if let (false, Some(secret)) = (created, stored) {
            return Ok((app_id, secret));
        }

        let credential = self
            .azure
            .add_application_password(&object_id, PASSWORD_DISPLAY_NAME)
            .await?;
        let secret = credential
            .secret_text
            .ok_or_else(|| ControllerError::Secret(format!("no secret returned for application {app_id}")))?;
        let data: ConnectionDetails = details([
            (keys::CLIENT_ID, Some(app_id.clone())),
            (keys::CLIENT_SECRET, Some(secret.clone())),
        ]);
        // Owner references cannot cross namespaces
        let owner = if namespace == self.namespace {
            self.owner.clone()
        } else {
            None
        };
        self.secrets.apply(namespace, secret_name, &data, owner).await?;
        Ok((app_id, secret))
    }

    async fn ensure_service_principal(
        &self,
        app_id: &str,
        progress: &mut AKSClusterObservation,
    ) -> Result<String, ControllerError> {
        if let Some(id) = &progress.service_principal_id {
            return Ok(id.clone());
        }
        // A new application takes a while to replicate through AD
        let principal = retry_with_backoff(
            &self.retry,
            "create service principal",
            |e: &AzureError| e.is_not_found() || matches!(e, AzureError::Api { status: 400, .. }),
            || self.azure.create_service_principal(app_id),
        )
        .await?;
        let id = returned(principal.id, "service principal id")?;
        progress.service_principal_id = Some(id.clone());
        self.save(progress).await?;
        Ok(id)
    }

    async fn ensure_role_assignment(
        &self,
        scope: &str,
        principal_id: &str,
        progress: &mut AKSClusterObservation,
    ) -> Result<(), ControllerError> {
        if progress.role_assignment_name.is_some() {
            return Ok(());
        }
        let name = uuid::Uuid::new_v4().to_string();
        let assignment = models::RoleAssignment {
            properties: models::RoleAssignmentProperties {
                role_definition_id: ids::role_definition(
                    self.azure.subscription_id(),
                    models::NETWORK_CONTRIBUTOR_ROLE_ID,
                ),
                principal_id: principal_id.to_string(),
                principal_type: Some("ServicePrincipal".to_string()),
                scope: None,
            },
            ..Default::default()
        };
        retry_with_backoff(
            &self.retry,
            "create role assignment",
            AzureError::is_principal_not_found,
            || self.azure.create_role_assignment(scope, &name, &assignment),
        )
        .await?;
        progress.role_assignment_name = Some(name);
        self.save(progress).await
    }

    async fn put_cluster(
        &self,
        p: &AKSClusterParameters,
        rg: &str,
        name: &str,
        client_id: &str,
        client_secret: &str,
        progress: &mut AKSClusterObservation,
    ) -> Result<(), ControllerError> {
        let cluster = desired_cluster(p, name, client_id, client_secret);
        let token = self
            .azure
            .begin_create_or_update_managed_cluster(rg, name, &cluster)
            .await?;
        progress.running_operation = token_string(token)?;
        progress.state = Some("Creating".to_string());
        self.save(progress).await
    }

    /// Client id and secret of a cluster whose AD objects already exist
    async fn stored_credentials(
        &self,
        p: &AKSClusterParameters,
        progress: &AKSClusterObservation,
    ) -> Result<(String, String), ControllerError> {
        let (namespace, secret_name) = self.secret_location(p);
        let secret = self.secrets.get_key(namespace, secret_name, keys::CLIENT_SECRET).await?;
        let secret = String::from_utf8(secret)
            .map_err(|_| ControllerError::Secret(format!("secret {namespace}/{secret_name} is not UTF-8")))?;
        let client_id = required(progress.application_id.as_deref(), "applicationId")?.to_string();
        Ok((client_id, secret))
    }

    async fn kubeconfig(&self, rg: &str, name: &str) -> Result<Option<String>, ControllerError> {
        let credentials = self.azure.list_cluster_admin_credentials(rg, name).await?;
        let Some(first) = credentials.kubeconfigs.into_iter().next() else {
            return Ok(None);
        };
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(first.value.as_bytes())
            .map_err(|e| ControllerError::Secret(format!("kubeconfig of cluster {name} is not base64: {e}")))?;
        String::from_utf8(decoded)
            .map(Some)
            .map_err(|_| ControllerError::Secret(format!("kubeconfig of cluster {name} is not UTF-8")))
    }
}

#[async_trait::async_trait]
impl ExternalClient<AKSCluster> for AksClusterClient {
    async fn observe(&self, cr: &AKSCluster) -> Result<ExternalObservation<AKSClusterObservation>, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let mut progress = self.progress(cr);

        let operation_running = self.poll_running_operation(&mut progress).await?;
        let cluster = found(self.azure.get_managed_cluster(rg, &name).await)?;
        let deleting = cr.meta().deletion_timestamp.is_some();
        if cluster.is_none() && operation_running && !deleting {
            // Accepted but not readable yet; creating again would start a second operation
            return Ok(ExternalObservation::exists(progress, Condition::creating(), true));
        }
        if !still_exists(cluster.is_some(), deleting, &progress) {
            return Ok(ExternalObservation::missing());
        }
        let Some(cluster) = cluster else {
            // Only AD objects remain
            progress.state = None;
            progress.endpoint = None;
            return Ok(ExternalObservation::exists(progress, Condition::deleting(), true));
        };

        let state = cluster.provisioning_state().map(str::to_string);
        progress.state = state.clone();
        progress.provider_id = cluster.id.clone();
        progress.endpoint = cluster.properties.fqdn.as_ref().map(|fqdn| format!("https://{fqdn}"));

        let up_to_date = operation_running
            || (state.as_deref() != Some(STATE_FAILED) && observed_node_count(&cluster) == Some(p.node_count()));
        let ready = if operation_running {
            Condition::creating()
        } else {
            ready_from_provisioning_state(state.as_deref())
        };

        let mut connection = ConnectionDetails::new();
        if !operation_running && state.as_deref() == Some(STATE_SUCCEEDED) {
            connection = details([
                (keys::KUBECONFIG, self.kubeconfig(rg, &name).await?),
                (keys::ENDPOINT, progress.endpoint.clone()),
            ]);
        }
        Ok(ExternalObservation::exists(progress, ready, up_to_date).with_connection_details(connection))
    }

    async fn create(&self, cr: &AKSCluster) -> Result<ExternalCreation, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let mut progress = self.progress(cr);

        let (client_id, client_secret) = self.ensure_application(p, &name, &mut progress).await?;
        let principal_id = self.ensure_service_principal(&client_id, &mut progress).await?;
        if let Some(subnet_id) = p.vnet_subnet_id.as_deref() {
            self.ensure_role_assignment(subnet_id, &principal_id, &mut progress)
                .await?;
        }

        info!("Creating AKS cluster {}", name);
        self.put_cluster(p, rg, &name, &client_id, &client_secret, &mut progress)
            .await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &AKSCluster) -> Result<ExternalUpdate, ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let mut progress = self.progress(cr);
        if progress.running_operation.is_some() {
            return Ok(ExternalUpdate::default());
        }

        let cluster = self.azure.get_managed_cluster(rg, &name).await?;
        if cluster.provisioning_state() == Some(STATE_FAILED) {
            info!("AKS cluster {} failed, re-issuing create", name);
            let (client_id, client_secret) = self.stored_credentials(p, &progress).await?;
            self.put_cluster(p, rg, &name, &client_id, &client_secret, &mut progress)
                .await?;
            return Ok(ExternalUpdate::default());
        }

        info!("Scaling AKS cluster {} to {} nodes", name, p.node_count());
        let pool = models::AgentPool {
            properties: models::AgentPoolProperties {
                count: Some(p.node_count()),
                ..Default::default()
            },
            ..Default::default()
        };
        let token = self
            .azure
            .begin_update_agent_pool(rg, &name, AGENT_POOL_NAME, &pool)
            .await?;
        progress.running_operation = token_string(token)?;
        progress.state = Some("Updating".to_string());
        self.save(&progress).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &AKSCluster) -> Result<(), ControllerError> {
        let p = &cr.spec.for_provider;
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let mut progress = self.progress(cr);
        if progress.running_operation.is_some() {
            return Ok(());
        }

        if let Some(cluster) = found(self.azure.get_managed_cluster(rg, &name).await)? {
            if cluster.provisioning_state() != Some(STATE_DELETING) {
                info!("Deleting AKS cluster {}", name);
                let token = match self.azure.begin_delete_managed_cluster(rg, &name).await {
                    Err(e) if e.is_not_found() => None,
                    other => other?,
                };
                progress.running_operation = token_string(token)?;
                progress.state = Some(STATE_DELETING.to_string());
                self.save(&progress).await?;
            }
            return Ok(());
        }

        if let Some(assignment) = progress.role_assignment_name.clone() {
            if let Some(scope) = p.vnet_subnet_id.as_deref() {
                ignore_not_found(self.azure.delete_role_assignment(scope, &assignment).await)?;
            }
            progress.role_assignment_name = None;
            self.save(&progress).await?;
        }
        if let Some(principal) = progress.service_principal_id.clone() {
            ignore_not_found(self.azure.delete_service_principal(&principal).await)?;
            progress.service_principal_id = None;
            self.save(&progress).await?;
        }
        if let Some(application) = progress.application_object_id.clone() {
            info!("Deleting AD application of AKS cluster {}", name);
            ignore_not_found(self.azure.delete_application(&application).await)?;
            progress.application_object_id = None;
            progress.application_id = None;
            self.save(&progress).await?;
        }
        Ok(())
    }
}
