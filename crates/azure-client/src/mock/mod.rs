//! Mock AzureClient for unit testing
//!
//! Stores ARM resources and Graph objects in memory as JSON, keyed by their
//! (case-insensitive) ID. Failures can be queued per operation name with
//! [`MockAzureClient::fail_next`], and long-running operations can be held
//! in progress for a number of polls.
//!
//! - `arm.rs` - the [`AzureClientTrait`](crate::AzureClientTrait) implementation
//! - `graph.rs` - Graph and role assignment behaviour

mod arm;
mod graph;

pub use arm::{MOCK_KUBECONFIG_B64, sample_iot_hub};

use crate::error::AzureError;
use crate::lro::{PollKind, PollerToken};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// What a tracked operation does when it completes
#[derive(Debug, Clone)]
pub(crate) enum PendingEffect {
    /// Mark the resource `Succeeded`
    Provision(String),
    /// Remove the resource
    Remove(String),
}

#[derive(Debug)]
pub(crate) struct PendingOperation {
    pub effect: PendingEffect,
    pub polls_left: u32,
    pub failure: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub resources: HashMap<String, Value>,
    pub failures: HashMap<String, VecDeque<AzureError>>,
    pub calls: Vec<String>,
    pub operations: HashMap<String, PendingOperation>,
    pub operation_polls: u32,
    pub operation_failure: Option<String>,
    pub next_id: u64,
}

/// Mock AzureClient for testing
#[derive(Clone, Debug)]
pub struct MockAzureClient {
    pub(crate) subscription_id: String,
    pub(crate) state: Arc<Mutex<MockState>>,
}

impl Default for MockAzureClient {
    fn default() -> Self {
        Self::new("00000000-0000-0000-0000-000000000000")
    }
}

impl MockAzureClient {
    /// Create a new mock client for a subscription
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue an error for the next call of `operation` (a trait method name)
    pub fn fail_next(&self, operation: &str, error: AzureError) {
        self.lock()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Names of all trait methods called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// How often `operation` was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Keep operations started from now on in progress for `polls` polls
    pub fn set_operation_polls(&self, polls: u32) {
        self.lock().operation_polls = polls;
    }

    /// Make operations started from now on fail with `message` when they complete
    pub fn fail_operations(&self, message: Option<&str>) {
        self.lock().operation_failure = message.map(str::to_string);
    }

    /// Store a resource under its ARM ID (or Graph key)
    pub fn insert<T: Serialize>(&self, id: &str, value: &T) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.lock().resources.insert(key(id), value);
    }

    /// Read a stored resource
    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        let value = self.lock().resources.get(&key(id)).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Whether a resource is stored
    pub fn contains(&self, id: &str) -> bool {
        self.lock().resources.contains_key(&key(id))
    }

    /// Remove a resource
    pub fn remove(&self, id: &str) {
        self.lock().resources.remove(&key(id));
    }

    /// Edit a stored resource's JSON in place
    pub fn modify(&self, id: &str, edit: impl FnOnce(&mut Value)) {
        if let Some(value) = self.lock().resources.get_mut(&key(id)) {
            edit(value);
        }
    }

    /// Set `properties.provisioningState` of a stored resource
    pub fn set_provisioning_state(&self, id: &str, state: &str) {
        self.modify(id, |v| set_provisioning_state(v, state));
    }

    /// Record a call and pop a queued failure, if any
    pub(crate) fn enter(&self, operation: &str) -> Result<(), AzureError> {
        let mut state = self.lock();
        state.calls.push(operation.to_string());
        match state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn next_id(&self) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        state.next_id
    }

    pub(crate) fn load<T: DeserializeOwned>(&self, id: &str) -> Result<T, AzureError> {
        let value = self
            .lock()
            .resources
            .get(&key(id))
            .cloned()
            .ok_or_else(|| AzureError::NotFound(format!("ResourceNotFound: {id}")))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Store a request body as the resource, filling in `id` and `name`
    pub(crate) fn store<T: Serialize>(
        &self,
        id: &str,
        body: &T,
        provisioning_state: Option<&str>,
    ) -> Result<Value, AzureError> {
        let mut value = serde_json::to_value(body)?;
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::String(id.to_string()));
            if let Some(name) = crate::ids::name_from_id(id) {
                map.insert("name".to_string(), Value::String(name.to_string()));
            }
        }
        if let Some(state) = provisioning_state {
            set_provisioning_state(&mut value, state);
        }
        self.lock().resources.insert(key(id), value.clone());
        Ok(value)
    }

    /// Merge a PATCH body into a stored resource
    pub(crate) fn merge<T: Serialize>(&self, id: &str, patch: &T) -> Result<(), AzureError> {
        let patch = serde_json::to_value(patch)?;
        let mut state = self.lock();
        let current = state
            .resources
            .get_mut(&key(id))
            .ok_or_else(|| AzureError::NotFound(format!("ResourceNotFound: {id}")))?;
        merge_json(current, patch);
        Ok(())
    }

    pub(crate) fn delete_existing(&self, id: &str) -> Result<(), AzureError> {
        match self.lock().resources.remove(&key(id)) {
            Some(_) => Ok(()),
            None => Err(AzureError::NotFound(format!("ResourceNotFound: {id}"))),
        }
    }

    /// Start a tracked long-running operation
    pub(crate) fn start_operation(&self, effect: PendingEffect) -> PollerToken {
        let id = self.next_id();
        let url = format!("mock://operations/{id}");
        let mut state = self.lock();
        let operation = PendingOperation {
            effect,
            polls_left: state.operation_polls,
            failure: state.operation_failure.clone(),
        };
        state.operations.insert(url.clone(), operation);
        PollerToken {
            kind: PollKind::AsyncOperation,
            url,
        }
    }

    pub(crate) fn sub(&self) -> &str {
        &self.subscription_id
    }

    /// Subnets stored under a virtual network, as (lowercased id, body)
    pub(crate) fn child_subnets(&self, vnet_id: &str) -> Vec<(String, Value)> {
        let prefix = format!("{}/subnets/", key(vnet_id));
        let mut subnets: Vec<(String, Value)> = self
            .lock()
            .resources
            .iter()
            .filter(|(k, _)| k.strip_prefix(&prefix).is_some_and(|rest| !rest.contains('/')))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        subnets.sort_by(|a, b| a.0.cmp(&b.0));
        subnets
    }
}

fn key(id: &str) -> String {
    id.to_ascii_lowercase()
}

fn set_provisioning_state(value: &mut Value, state: &str) {
    if let Value::Object(map) = value {
        let properties = map
            .entry("properties")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(props) = properties {
            props.insert(
                "provisioningState".to_string(),
                Value::String(state.to_string()),
            );
        }
    }
}

fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (k, v) in patch {
                merge_json(target.entry(k).or_insert(Value::Null), v);
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_json() {
        let mut target = json!({"a": 1, "p": {"x": 1, "y": 2}});
        merge_json(&mut target, json!({"p": {"y": 3}, "b": true}));
        assert_eq!(target, json!({"a": 1, "b": true, "p": {"x": 1, "y": 3}}));
    }

    #[test]
    fn test_failure_queue() {
        let mock = MockAzureClient::default();
        mock.fail_next("op", AzureError::InvalidRequest("boom".into()));
        assert!(mock.enter("op").is_err());
        assert!(mock.enter("op").is_ok());
        assert_eq!(mock.call_count("op"), 2);
    }

    #[test]
    fn test_ids_are_case_insensitive() {
        let mock = MockAzureClient::default();
        mock.insert("/subscriptions/S/resourceGroups/RG", &json!({"location": "x"}));
        assert!(mock.contains("/subscriptions/s/resourcegroups/rg"));
    }
}
