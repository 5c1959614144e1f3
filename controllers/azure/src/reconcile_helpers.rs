//! Helper functions for common reconciliation patterns
//!
//! Patch builders used by the managed reconcile driver, and the comparisons
//! and condition mappings shared by the per-kind external clients.

use crate::error::ControllerError;
use azure_client::AzureError;
use crds::{Condition, EXTERNAL_NAME_ANNOTATION, MANAGED_FINALIZER, Managed};
use kube::{Resource, ResourceExt};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Whether the managed finalizer is present
pub fn has_finalizer<K: Resource>(resource: &K) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|f| f == MANAGED_FINALIZER))
}

/// Merge patch adding or removing the managed finalizer, keeping any others
pub fn finalizer_patch<K: Resource>(resource: &K, present: bool) -> Value {
    let mut finalizers: Vec<String> = resource
        .meta()
        .finalizers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|f| f != MANAGED_FINALIZER)
        .collect();
    if present {
        finalizers.push(MANAGED_FINALIZER.to_string());
    }
    json!({ "metadata": { "finalizers": finalizers } })
}

/// Merge patch setting the external-name annotation
pub fn external_name_patch(external_name: &str) -> Value {
    json!({ "metadata": { "annotations": { EXTERNAL_NAME_ANNOTATION: external_name } } })
}

/// Merge patch writing resolved reference values into `spec.forProvider`
pub fn resolved_patch(resolved: &BTreeMap<&'static str, String>) -> Value {
    json!({ "spec": { "forProvider": resolved } })
}

/// JSON merge patch turning `current` into `desired`
///
/// Keys missing from `desired` are set to `null` so the API server removes
/// them; arrays and scalars are replaced wholesale.
pub fn merge_patch(current: &Value, desired: &Value) -> Value {
    match (current, desired) {
        (Value::Object(current), Value::Object(desired)) => {
            let mut patch = Map::new();
            for (key, value) in desired {
                match current.get(key) {
                    Some(existing) if existing == value => {}
                    Some(existing) => {
                        patch.insert(key.clone(), merge_patch(existing, value));
                    }
                    None => {
                        patch.insert(key.clone(), value.clone());
                    }
                }
            }
            for key in current.keys() {
                if !desired.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Value::Object(patch)
        }
        _ => desired.clone(),
    }
}

/// Status patch for new conditions and (optionally) a new observation
///
/// Returns `None` when the status would not change. Leaving `at_provider`
/// as `None` keeps the recorded observation.
pub fn status_patch(
    current_status: &Value,
    conditions: &[Condition],
    at_provider: Option<&Value>,
) -> Result<Option<Value>, ControllerError> {
    let mut desired = match current_status {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    desired.insert("conditions".to_string(), serde_json::to_value(conditions)?);
    if let Some(observation) = at_provider {
        desired.insert("atProvider".to_string(), observation.clone());
    }
    let desired = Value::Object(desired);
    if &desired == current_status {
        return Ok(None);
    }
    Ok(Some(json!({ "status": merge_patch(current_status, &desired) })))
}

/// Azure name of the resource: the external-name annotation, else `metadata.name`
pub fn external_name<K: Managed>(resource: &K) -> String {
    resource
        .external_name()
        .map_or_else(|| resource.name_any(), str::to_string)
}

/// Turn a not-found response into `None`
pub fn found<T>(result: Result<T, AzureError>) -> Result<Option<T>, ControllerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A parameter that must be set (directly or through a resolved reference)
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ControllerError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ControllerError::Unresolved(field.to_string()))
}

/// Ready condition for an ARM `provisioningState`
///
/// `Succeeded` is Available, `Deleting` is Deleting, `Failed` and `Canceled`
/// are Unavailable, anything else is still Creating.
pub fn ready_from_provisioning_state(state: Option<&str>) -> Condition {
    match state {
        Some(s) if s.eq_ignore_ascii_case("Succeeded") => Condition::available(),
        Some(s) if s.eq_ignore_ascii_case("Deleting") => Condition::deleting(),
        Some(s) if s.eq_ignore_ascii_case("Failed") || s.eq_ignore_ascii_case("Canceled") => {
            Condition::unavailable()
        }
        _ => Condition::creating(),
    }
}

/// Optional value is up to date when unset in the spec or equal to the observed value
pub fn optional_matches<T: PartialEq>(desired: Option<&T>, observed: Option<&T>) -> bool {
    desired.is_none_or(|d| observed == Some(d))
}

/// Case-insensitive string comparison for ARM enum-like values
pub fn eq_ignore_case(desired: &str, observed: Option<&str>) -> bool {
    observed.is_some_and(|o| o.eq_ignore_ascii_case(desired))
}
