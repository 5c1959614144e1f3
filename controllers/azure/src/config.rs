//! Controller configuration
//!
//! Read once at startup from environment variables.

use crate::error::ControllerError;
use azure_client::AzureEndpoints;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings of the controller
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Requeue interval of healthy resources (drift detection)
    pub poll_interval: Duration,
    /// Concurrent reconciles per kind
    pub max_concurrent_reconciles: u16,
    /// Quiet period before a burst of events is reconciled
    pub debounce: Duration,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// ARM and Graph base URLs
    pub endpoints: AzureEndpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            poll_interval: Duration::from_secs(60),
            max_concurrent_reconciles: 3,
            debounce: Duration::from_secs(5),
            metrics_port: 8080,
            endpoints: AzureEndpoints::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable if set
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let defaults = Self::default();
        let mut endpoints = defaults.endpoints;
        if let Some(url) = lookup("AZURE_MANAGEMENT_ENDPOINT") {
            endpoints.management = url;
        }
        if let Some(url) = lookup("AZURE_GRAPH_ENDPOINT") {
            endpoints.graph = url;
        }

        Ok(Self {
            namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty()),
            poll_interval: parse(&lookup, "POLL_INTERVAL_SECONDS")?
                .map_or(defaults.poll_interval, Duration::from_secs),
            max_concurrent_reconciles: parse(&lookup, "MAX_CONCURRENT_RECONCILES")?
                .unwrap_or(defaults.max_concurrent_reconciles),
            debounce: parse(&lookup, "DEBOUNCE_SECONDS")?
                .map_or(defaults.debounce, Duration::from_secs),
            metrics_port: parse(&lookup, "METRICS_PORT")?.unwrap_or(defaults.metrics_port),
            endpoints,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ControllerError>
where
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                ControllerError::InvalidConfig(format!("{key}={raw:?}: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.namespace, None);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.max_concurrent_reconciles, 3);
        assert_eq!(config.debounce, Duration::from_secs(5));
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.endpoints.management, "https://management.azure.com");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", "crossplane-system"),
            ("POLL_INTERVAL_SECONDS", "300"),
            ("MAX_CONCURRENT_RECONCILES", "8"),
            ("METRICS_PORT", "9090"),
            ("AZURE_MANAGEMENT_ENDPOINT", "https://management.chinacloudapi.cn"),
        ]))
        .unwrap();
        assert_eq!(config.namespace.as_deref(), Some("crossplane-system"));
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.max_concurrent_reconciles, 8);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.endpoints.management, "https://management.chinacloudapi.cn");
    }

    #[test]
    fn test_empty_namespace_means_all() {
        let config = Config::from_lookup(lookup(&[("WATCH_NAMESPACE", "")])).unwrap();
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[("POLL_INTERVAL_SECONDS", "soon")])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(msg) if msg.contains("POLL_INTERVAL_SECONDS")));

        let err = Config::from_lookup(lookup(&[("METRICS_PORT", "70000")])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }
}
