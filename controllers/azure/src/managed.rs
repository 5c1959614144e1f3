//! Managed resource reconciliation
//!
//! Every Azure kind is reconciled by the same driver. A kind supplies an
//! [`ExternalClient`] that can observe, create, update and delete the Azure
//! object behind one custom resource; the driver owns everything around it:
//!
//! 1. the finalizer, and deletion (honouring the `Orphan` policy)
//! 2. defaulting the external-name annotation
//! 3. resolving references into `spec.forProvider`
//! 4. connecting to Azure through the resource's ProviderConfig
//! 5. observe, then create or update as needed
//! 6. publishing connection details
//! 7. writing `Ready`/`Synced` conditions and `atProvider`, only when changed

use crate::connection::{ConnectionDetails, SecretStore, merge_details};
use crate::error::ControllerError;
use crate::metrics::ReconcileTimer;
use crate::reconcile_helpers::{
    external_name_patch, finalizer_patch, has_finalizer, merge_patch, resolved_patch, status_patch,
};
use crate::reconciler::Reconciler;
use crate::references::{Resolved, Resolver};
use azure_client::AzureClientTrait;
use crds::{Condition, DeletionPolicy, Managed, set_condition};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Patch, PatchParams};
use kube::{Api, Resource, ResourceExt};
use kube_runtime::controller::Action;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Requeue delay while Azure is still working on a resource
pub const SHORT_WAIT: Duration = Duration::from_secs(15);

/// What `observe` found in Azure
#[derive(Debug, Clone)]
pub struct ExternalObservation<O> {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    /// Ready condition to report; `None` keeps the current one
    pub ready: Option<Condition>,
    pub at_provider: Option<O>,
    pub connection_details: ConnectionDetails,
}

impl<O> ExternalObservation<O> {
    /// The Azure object does not exist
    pub fn missing() -> Self {
        Self {
            resource_exists: false,
            resource_up_to_date: false,
            ready: None,
            at_provider: None,
            connection_details: ConnectionDetails::new(),
        }
    }

    /// The Azure object exists
    pub fn exists(at_provider: O, ready: Condition, up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            ready: Some(ready),
            at_provider: Some(at_provider),
            connection_details: ConnectionDetails::new(),
        }
    }

    #[must_use]
    pub fn with_connection_details(mut self, details: ConnectionDetails) -> Self {
        self.connection_details = details;
        self
    }
}

/// Result of `create`
#[derive(Debug, Default)]
pub struct ExternalCreation {
    /// Name Azure assigned, when it differs from the requested one
    pub external_name: Option<String>,
    pub connection_details: ConnectionDetails,
}

/// Result of `update`
#[derive(Debug, Default)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Observe/Create/Update/Delete against Azure for one kind
#[async_trait::async_trait]
pub trait ExternalClient<K: Managed>: Send + Sync {
    async fn observe(&self, cr: &K) -> Result<ExternalObservation<K::Observation>, ControllerError>;
    async fn create(&self, cr: &K) -> Result<ExternalCreation, ControllerError>;
    async fn update(&self, cr: &K) -> Result<ExternalUpdate, ControllerError>;
    /// Delete the Azure object; a missing object counts as deleted
    async fn delete(&self, cr: &K) -> Result<(), ControllerError>;
}

/// Persists `status.atProvider` while a multi-step create is in flight
#[async_trait::async_trait]
pub trait StatusRecorder<O>: Send + Sync {
    async fn record(&self, at_provider: &O) -> Result<(), ControllerError>;
}

/// Everything an external client may need besides the resource itself
pub struct ExternalContext<O> {
    pub azure: Arc<dyn AzureClientTrait>,
    pub secrets: Arc<dyn SecretStore>,
    pub recorder: Arc<dyn StatusRecorder<O>>,
    /// Namespace of the managed resource
    pub namespace: String,
    /// Owner reference pointing at the managed resource
    pub owner: Option<OwnerReference>,
}

impl<O> std::fmt::Debug for ExternalContext<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalContext")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// A managed kind the driver can reconcile
#[async_trait::async_trait]
pub trait ManagedKind: Managed + Resource<Scope = NamespaceResourceScope> {
    /// Values for unset `forProvider` fields taken from their references
    async fn resolve_references(&self, _resolver: &Resolver) -> Result<Resolved, ControllerError> {
        Ok(Resolved::new())
    }

    /// External client bound to one Azure connection
    fn external(ctx: ExternalContext<Self::Observation>) -> Box<dyn ExternalClient<Self>>;
}

/// Writes `status.atProvider` of one resource through the Kubernetes API
pub struct KubeStatusRecorder<K: Managed> {
    api: Api<K>,
    name: String,
    last: Mutex<Value>,
}

impl<K: Managed> KubeStatusRecorder<K> {
    pub fn new(api: Api<K>, resource: &K) -> Result<Self, ControllerError> {
        let last = match resource.at_provider() {
            Some(o) => serde_json::to_value(o)?,
            None => Value::Null,
        };
        Ok(Self {
            api,
            name: resource.name_any(),
            last: Mutex::new(last),
        })
    }
}

#[async_trait::async_trait]
impl<K: Managed> StatusRecorder<K::Observation> for KubeStatusRecorder<K> {
    async fn record(&self, at_provider: &K::Observation) -> Result<(), ControllerError> {
        let desired = serde_json::to_value(at_provider)?;
        let patch = {
            let last = self.last.lock().unwrap_or_else(|p| p.into_inner());
            if *last == desired {
                return Ok(());
            }
            serde_json::json!({ "status": { "atProvider": merge_patch(&last, &desired) } })
        };
        self.api
            .patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = desired;
        debug!("Recorded progress of {} {}", K::kind(&()), self.name);
        Ok(())
    }
}

fn resource_key<K: Managed>(resource: &K) -> String {
    format!(
        "{}/{}/{}",
        K::kind(&()),
        resource.namespace().unwrap_or_default(),
        resource.name_any()
    )
}

/// Reconcile one managed resource
pub async fn reconcile<K: ManagedKind>(
    resource: Arc<K>,
    reconciler: Arc<Reconciler>,
) -> Result<Action, ControllerError> {
    let kind = K::kind(&()).to_string();
    let namespace = resource.namespace().unwrap_or_default();
    let timer = ReconcileTimer::start(&kind);
    let api: Api<K> = Api::namespaced(reconciler.client.clone(), &namespace);

    info!("Reconciling {} {}/{}", kind, namespace, resource.name_any());

    match reconcile_resource(&api, (*resource).clone(), &reconciler).await {
        Ok(action) => {
            reconciler.backoffs.reset(&resource_key(&*resource));
            Ok(action)
        }
        Err(e) => {
            timer.failed();
            if let Err(status_err) = record_error(&api, &resource, &e).await {
                warn!(
                    "Failed to record error on {} {}/{}: {}",
                    kind,
                    namespace,
                    resource.name_any(),
                    status_err
                );
            }
            Err(e)
        }
    }
}

/// Backoff before retrying a failed resource
pub fn error_backoff<K: Managed>(resource: &K, reconciler: &Reconciler) -> Duration {
    reconciler.backoffs.next_delay(&resource_key(resource))
}

async fn reconcile_resource<K: ManagedKind>(
    api: &Api<K>,
    mut cr: K,
    reconciler: &Reconciler,
) -> Result<Action, ControllerError> {
    let kind = K::kind(&());
    let name = cr.name_any();
    let namespace = cr.namespace().unwrap_or_default();
    let pp = PatchParams::default();

    if cr.meta().deletion_timestamp.is_some() {
        return finalize(api, cr, reconciler).await;
    }

    if !has_finalizer(&cr) {
        debug!("Adding finalizer to {} {}/{}", kind, namespace, name);
        cr = api
            .patch(&name, &pp, &Patch::Merge(&finalizer_patch(&cr, true)))
            .await?;
    }

    if cr.external_name().is_none() {
        debug!("Defaulting external name of {} {}/{} to {}", kind, namespace, name, name);
        cr = api
            .patch(&name, &pp, &Patch::Merge(&external_name_patch(&name)))
            .await?;
    }

    let resolver = Resolver::new(reconciler.client.clone(), &namespace);
    let resolved = cr.resolve_references(&resolver).await?;
    if !resolved.is_empty() {
        info!(
            "Resolved references of {} {}/{}: {:?}",
            kind,
            namespace,
            name,
            resolved.keys().collect::<Vec<_>>()
        );
        cr = api
            .patch(&name, &pp, &Patch::Merge(&resolved_patch(&resolved)))
            .await?;
    }

    let external = reconciler.external_client(api, &cr).await?;
    let observation = external.observe(&cr).await?;
    let step = next_step(&observation);
    let ExternalObservation {
        resource_up_to_date,
        ready,
        at_provider: observed,
        connection_details: mut details,
        ..
    } = observation;

    let mut at_provider = None;
    match step {
        Step::Observe => {
            if let Some(o) = &observed {
                at_provider = Some(serde_json::to_value(o)?);
            }
        }
        Step::Update => {
            // The update may record progress of its own; the next observe reports it
            info!("Updating {} {}/{} in Azure", kind, namespace, name);
            let update = external.update(&cr).await?;
            merge_details(&mut details, &update.connection_details);
        }
        Step::Create => {
            info!("Creating {} {}/{} in Azure", kind, namespace, name);
            let creation = external.create(&cr).await?;
            if let Some(external_name) = creation.external_name.filter(|n| Some(n.as_str()) != cr.external_name()) {
                cr = api
                    .patch(&name, &pp, &Patch::Merge(&external_name_patch(&external_name)))
                    .await?;
            }
            merge_details(&mut details, &creation.connection_details);
        }
    }

    let mut conditions = cr.conditions().to_vec();
    let requeue = settle(
        &mut conditions,
        step,
        ready,
        resource_up_to_date,
        reconciler.config.poll_interval,
    );

    publish_connection_details(reconciler, &cr, &details).await?;
    write_status(api, &cr, &conditions, at_provider.as_ref()).await?;

    Ok(Action::requeue(requeue))
}

/// What the driver does after observing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Create,
    Update,
    /// Up to date; only record the observation
    Observe,
}

pub(crate) fn next_step<O>(observation: &ExternalObservation<O>) -> Step {
    match (observation.resource_exists, observation.resource_up_to_date) {
        (false, _) => Step::Create,
        (true, false) => Step::Update,
        (true, true) => Step::Observe,
    }
}

/// Apply the conditions of a successful step; returns the requeue delay
pub(crate) fn settle(
    conditions: &mut Vec<Condition>,
    step: Step,
    ready: Option<Condition>,
    up_to_date: bool,
    poll_interval: Duration,
) -> Duration {
    match step {
        Step::Create => set_condition(conditions, Condition::creating()),
        Step::Update | Step::Observe => {
            if let Some(ready) = ready {
                set_condition(conditions, ready);
            }
        }
    }
    set_condition(conditions, Condition::reconcile_success());

    if step == Step::Observe && up_to_date && crds::is_ready(conditions) {
        poll_interval
    } else {
        SHORT_WAIT
    }
}

/// How a resource marked for deletion is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deletion {
    /// Our finalizer is already gone
    Released,
    /// Remove the finalizer without touching Azure
    Orphan,
    /// Delete from Azure, then remove the finalizer
    External,
}

pub(crate) fn deletion<K: Managed>(cr: &K) -> Deletion {
    if !has_finalizer(cr) {
        Deletion::Released
    } else if cr.deletion_policy() == DeletionPolicy::Orphan {
        Deletion::Orphan
    } else {
        Deletion::External
    }
}

/// Conditions while the Azure object is being deleted
pub(crate) fn deleting_conditions(current: &[Condition]) -> Vec<Condition> {
    let mut conditions = current.to_vec();
    set_condition(&mut conditions, Condition::deleting());
    set_condition(&mut conditions, Condition::reconcile_success());
    conditions
}

/// Conditions after a failed reconcile
pub(crate) fn error_conditions(current: &[Condition], error: &ControllerError) -> Vec<Condition> {
    let mut conditions = current.to_vec();
    set_condition(&mut conditions, Condition::reconcile_error(error.to_string()));
    conditions
}

async fn finalize<K: ManagedKind>(
    api: &Api<K>,
    cr: K,
    reconciler: &Reconciler,
) -> Result<Action, ControllerError> {
    let kind = K::kind(&());
    let name = cr.name_any();
    let namespace = cr.namespace().unwrap_or_default();

    match deletion(&cr) {
        Deletion::Released => return Ok(Action::await_change()),
        Deletion::Orphan => {
            info!("Orphaning {} {}/{}; Azure resource is left in place", kind, namespace, name);
            release(api, &cr, reconciler).await?;
            return Ok(Action::await_change());
        }
        Deletion::External => {}
    }

    let external = reconciler.external_client(api, &cr).await?;
    let observation = match external.observe(&cr).await {
        Ok(observation) => observation,
        Err(ControllerError::Unresolved(field)) => {
            info!(
                "{} {}/{} never resolved {}; nothing to delete in Azure",
                kind, namespace, name, field
            );
            ExternalObservation::missing()
        }
        Err(e) => return Err(e),
    };

    if observation.resource_exists {
        info!("Deleting {} {}/{} from Azure", kind, namespace, name);
        match external.delete(&cr).await {
            Err(e) if e.is_not_found() => {}
            other => other?,
        }
        write_status(api, &cr, &deleting_conditions(cr.conditions()), None).await?;
        return Ok(Action::requeue(SHORT_WAIT));
    }

    info!("{} {}/{} is gone from Azure, removing finalizer", kind, namespace, name);
    release(api, &cr, reconciler).await?;
    Ok(Action::await_change())
}

/// Remove the finalizer and forget the resource's failure backoff
async fn release<K: ManagedKind>(api: &Api<K>, cr: &K, reconciler: &Reconciler) -> Result<(), ControllerError> {
    remove_finalizer(api, cr).await?;
    reconciler.backoffs.reset(&resource_key(cr));
    Ok(())
}

async fn remove_finalizer<K: ManagedKind>(api: &Api<K>, cr: &K) -> Result<(), ControllerError> {
    let patch = finalizer_patch(cr, false);
    match api
        .patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn publish_connection_details<K: ManagedKind>(
    reconciler: &Reconciler,
    cr: &K,
    details: &ConnectionDetails,
) -> Result<(), ControllerError> {
    let Some(target) = cr.connection_secret_ref() else {
        return Ok(());
    };
    if details.is_empty() {
        return Ok(());
    }
    let own_namespace = cr.namespace().unwrap_or_default();
    let namespace = target.namespace.clone().unwrap_or_else(|| own_namespace.clone());
    // Owner references cannot cross namespaces
    let owner = if namespace == own_namespace {
        cr.controller_owner_ref(&())
    } else {
        None
    };
    reconciler
        .secrets
        .apply(&namespace, &target.name, details, owner)
        .await
}

async fn write_status<K: ManagedKind>(
    api: &Api<K>,
    cr: &K,
    conditions: &[Condition],
    at_provider: Option<&Value>,
) -> Result<(), ControllerError> {
    let current = serde_json::to_value(cr)?
        .get("status")
        .cloned()
        .unwrap_or(Value::Null);
    let Some(patch) = status_patch(&current, conditions, at_provider)? else {
        debug!("Status of {} {} unchanged", K::kind(&()), cr.name_any());
        return Ok(());
    };
    api.patch_status(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

async fn record_error<K: ManagedKind>(
    api: &Api<K>,
    cr: &K,
    error: &ControllerError,
) -> Result<(), ControllerError> {
    match write_status(api, cr, &error_conditions(cr.conditions(), error), None).await {
        Err(ControllerError::Kube(kube::Error::Api(e))) if e.code == 404 => Ok(()),
        other => other,
    }
}
