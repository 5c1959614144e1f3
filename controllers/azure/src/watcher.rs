//! Kubernetes resource watchers.
//!
//! Every managed kind is watched by the same generic `watch_resource()`,
//! which runs a `kube_runtime::Controller` with the shared reconcile driver.
//! The controller handles reconnection and requeueing; failed resources are
//! retried on the per-resource Fibonacci backoff.

use crate::error::ControllerError;
use crate::managed::{self, ManagedKind};
use crate::reconciler::Reconciler;
use futures::StreamExt;
use kube::{Api, Resource, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use tracing::{debug, error, info};

fn error_policy<K: ManagedKind>(obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>) -> Action {
    let delay = managed::error_backoff(obj.as_ref(), &ctx);
    error!(
        "Reconciliation error for {} {}/{}: {} (retrying in {:?})",
        K::kind(&()),
        obj.namespace().unwrap_or_default(),
        obj.name_any(),
        error,
        delay
    );
    Action::requeue(delay)
}

/// Watch one managed kind until the watch stream ends
pub async fn watch_resource<K: ManagedKind>(reconciler: Arc<Reconciler>) -> Result<(), ControllerError> {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = match reconciler.config.namespace.as_deref() {
        Some(ns) => Api::namespaced(reconciler.client.clone(), ns),
        None => Api::all(reconciler.client.clone()),
    };
    info!("Starting {} watcher", kind);

    // Our own writes come back as watch events. The reconcile they trigger
    // settles because unchanged status is never rewritten.
    let controller_config = ControllerConfig::default()
        .debounce(reconciler.config.debounce)
        .concurrency(reconciler.config.max_concurrent_reconciles);

    Controller::new(api, watcher::Config::default().any_semantic())
        .with_config(controller_config)
        .run(managed::reconcile::<K>, error_policy::<K>, reconciler)
        .for_each(|res| {
            let kind = kind.clone();
            async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled {} {}", kind, obj),
                    Err(e) => error!("Controller error for {}: {}", kind, e),
                }
            }
        })
        .await;

    Err(ControllerError::Watch(format!("{kind} watch stream ended")))
}
