//! Azure Provider Controller
//!
//! Reconciles Azure managed-resource CRDs (resource groups, networks, Redis,
//! storage accounts, DNS zones, MySQL/PostgreSQL servers and their rules, IoT
//! Hub endpoints and AKS clusters) against Azure Resource Manager, using the
//! credentials of the ProviderConfig each resource names.

mod backoff;
mod config;
mod connection;
mod connector;
mod controller;
mod error;
mod managed;
mod metrics;
mod password;
mod reconcile_helpers;
mod reconciler;
mod references;
mod server;
mod watcher;

#[cfg(test)]
mod managed_test;
#[cfg(test)]
mod reconcile_helpers_test;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use crate::server::ServerState;
use controller::Controller;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| ControllerError::InvalidConfig("rustls crypto provider already installed".to_string()))?;

    info!("Starting Azure Provider Controller");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Poll interval: {:?}", config.poll_interval);
    info!("  Management endpoint: {}", config.endpoints.management);

    metrics::register_metrics()
        .map_err(|e| ControllerError::InvalidConfig(format!("failed to register metrics: {e}")))?;

    let state = Arc::new(ServerState::default());
    let port = config.metrics_port;
    let server_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = server::start_server(port, server_state).await {
            error!("HTTP server stopped: {}", e);
        }
    });

    let controller = Controller::new(config).await?;
    state.is_ready.store(true, Ordering::Relaxed);
    controller.run().await
}
