//! Test utilities for unit testing external clients
//!
//! In-memory stand-ins for the Kubernetes side (secrets, status writes) so
//! external clients can be driven against a [`MockAzureClient`].

use crate::connection::{ConnectionDetails, SecretStore};
use crate::error::ControllerError;
use crate::managed::{ExternalContext, StatusRecorder};
use azure_client::MockAzureClient;
use crds::{Condition, EXTERNAL_NAME_ANNOTATION, Managed};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Namespace used by test resources
pub const TEST_NAMESPACE: &str = "default";

/// Copy of `resource` reporting `Ready=True`
pub fn ready<K: Managed>(resource: K) -> K {
    let mut value = serde_json::to_value(&resource).expect("serialize resource");
    let conditions = serde_json::to_value(vec![Condition::available()]).expect("serialize conditions");
    match value.get_mut("status").filter(|s| s.is_object()) {
        Some(status) => {
            status["conditions"] = conditions;
        }
        None => {
            value["status"] = serde_json::json!({ "conditions": conditions });
        }
    }
    serde_json::from_value(value).expect("deserialize resource")
}

/// `resource` with the external-name annotation set
pub fn with_external_name<K: Managed>(mut resource: K, name: &str) -> K {
    resource
        .meta_mut()
        .annotations
        .get_or_insert_with(Default::default)
        .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.to_string());
    resource
}

/// `resource` placed in [`TEST_NAMESPACE`]
pub fn namespaced<K: Managed>(mut resource: K) -> K {
    resource.meta_mut().namespace = Some(TEST_NAMESPACE.to_string());
    resource
}

/// `resource` with the given `status.atProvider`
pub fn with_observation<K: Managed>(resource: K, observation: &K::Observation) -> K {
    let mut value = serde_json::to_value(&resource).expect("serialize resource");
    let observation = serde_json::to_value(observation).expect("serialize observation");
    match value.get_mut("status").filter(|s| s.is_object()) {
        Some(status) => {
            status["atProvider"] = observation;
        }
        None => {
            value["status"] = serde_json::json!({ "conditions": [], "atProvider": observation });
        }
    }
    serde_json::from_value(value).expect("deserialize resource")
}

/// Secrets kept in memory, keyed by namespace and name
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<(String, String), ConnectionDetails>>,
}

impl MemorySecretStore {
    pub fn insert(&self, namespace: &str, name: &str, data: ConnectionDetails) {
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), data);
    }

    /// A key of a stored secret, as UTF-8
    pub fn value(&self, namespace: &str, name: &str, key: &str) -> Option<String> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|data| data.get(key))
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

#[async_trait::async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConnectionDetails>, ControllerError> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn apply(
        &self,
        namespace: &str,
        name: &str,
        data: &ConnectionDetails,
        _owner: Option<OwnerReference>,
    ) -> Result<(), ControllerError> {
        self.secrets
            .lock()
            .unwrap()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .extend(data.clone());
        Ok(())
    }
}

/// Records every status write instead of patching the API server
#[derive(Debug)]
pub struct MemoryStatusRecorder<O> {
    records: Mutex<Vec<O>>,
}

impl<O> Default for MemoryStatusRecorder<O> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<O: Clone> MemoryStatusRecorder<O> {
    pub fn last(&self) -> Option<O> {
        self.records.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl<O: Clone + Send + Sync> StatusRecorder<O> for MemoryStatusRecorder<O> {
    async fn record(&self, at_provider: &O) -> Result<(), ControllerError> {
        self.records.lock().unwrap().push(at_provider.clone());
        Ok(())
    }
}

/// External context over a mock client and in-memory stores
pub struct TestContext<O> {
    pub azure: MockAzureClient,
    pub secrets: Arc<MemorySecretStore>,
    pub recorder: Arc<MemoryStatusRecorder<O>>,
}

impl<O: Clone + Send + Sync + 'static> TestContext<O> {
    pub fn new() -> Self {
        Self::with_azure(MockAzureClient::default())
    }

    /// Context sharing another context's mock Azure state
    pub fn with_azure(azure: MockAzureClient) -> Self {
        Self {
            azure,
            secrets: Arc::new(MemorySecretStore::default()),
            recorder: Arc::new(MemoryStatusRecorder::default()),
        }
    }

    pub fn context(&self) -> ExternalContext<O> {
        ExternalContext {
            azure: Arc::new(self.azure.clone()),
            secrets: self.secrets.clone(),
            recorder: self.recorder.clone(),
            namespace: TEST_NAMESPACE.to_string(),
            owner: None,
        }
    }
}
