//! Unit tests for reconcile_helpers module

use crate::reconcile_helpers::*;
use azure_client::AzureError;
use crds::{Condition, ConditionStatus, MANAGED_FINALIZER, REASON_CREATING, ResourceGroup};
use serde_json::json;
use std::collections::BTreeMap;

#[test]
fn test_finalizer_patch_keeps_foreign_finalizers() {
    let mut group = ResourceGroup::new("rg", Default::default());
    group.metadata.finalizers = Some(vec!["example.com/other".to_string()]);
    assert!(!has_finalizer(&group));

    let patch = finalizer_patch(&group, true);
    assert_eq!(
        patch,
        json!({"metadata": {"finalizers": ["example.com/other", MANAGED_FINALIZER]}})
    );

    group.metadata.finalizers = Some(vec!["example.com/other".to_string(), MANAGED_FINALIZER.to_string()]);
    assert!(has_finalizer(&group));
    assert_eq!(
        finalizer_patch(&group, false),
        json!({"metadata": {"finalizers": ["example.com/other"]}})
    );
}

#[test]
fn test_external_name_patch() {
    assert_eq!(
        external_name_patch("rg-prod"),
        json!({"metadata": {"annotations": {"azure.microscaler.io/external-name": "rg-prod"}}})
    );
}

#[test]
fn test_resolved_patch() {
    let mut resolved = BTreeMap::new();
    resolved.insert("resourceGroupName", "rg".to_string());
    assert_eq!(
        resolved_patch(&resolved),
        json!({"spec": {"forProvider": {"resourceGroupName": "rg"}}})
    );
}

#[test]
fn test_merge_patch_nulls_removed_keys() {
    let current = json!({"state": "Creating", "runningOperation": "token", "endpoint": "a"});
    let desired = json!({"state": "Succeeded", "endpoint": "a"});
    assert_eq!(
        merge_patch(&current, &desired),
        json!({"state": "Succeeded", "runningOperation": null})
    );
}

#[test]
fn test_status_patch_none_when_unchanged() {
    let conditions = vec![Condition::available(), Condition::reconcile_success()];
    let observation = json!({"id": "/subscriptions/s/resourceGroups/rg"});
    let current = json!({
        "conditions": serde_json::to_value(&conditions).unwrap(),
        "atProvider": observation.clone(),
    });

    assert!(status_patch(&current, &conditions, Some(&observation)).unwrap().is_none());
    assert!(status_patch(&current, &conditions, None).unwrap().is_none());
}

#[test]
fn test_status_patch_from_empty_status() {
    let conditions = vec![Condition::creating()];
    let patch = status_patch(&serde_json::Value::Null, &conditions, None)
        .unwrap()
        .unwrap();
    assert_eq!(patch["status"]["conditions"][0]["reason"], REASON_CREATING);
    assert!(patch["status"].get("atProvider").is_none());
}

#[test]
fn test_status_patch_clears_dropped_observation_fields() {
    let conditions = vec![Condition::available()];
    let current = json!({
        "conditions": serde_json::to_value(&conditions).unwrap(),
        "atProvider": {"state": "Creating", "runningOperation": "abc"},
    });
    let patch = status_patch(&current, &conditions, Some(&json!({"state": "Succeeded"})))
        .unwrap()
        .unwrap();
    assert_eq!(
        patch,
        json!({"status": {"atProvider": {"state": "Succeeded", "runningOperation": null}}})
    );
}

#[test]
fn test_required() {
    assert_eq!(required(Some("rg"), "resourceGroupName").unwrap(), "rg");
    let err = required(None, "resourceGroupName").unwrap_err();
    assert_eq!(err.to_string(), "resourceGroupName is not set and has no reference");
    assert!(required(Some(""), "resourceGroupName").is_err());
}

#[test]
fn test_ready_from_provisioning_state() {
    assert_eq!(ready_from_provisioning_state(Some("Succeeded")).status, ConditionStatus::True);
    assert_eq!(ready_from_provisioning_state(Some("Deleting")).reason, "Deleting");
    assert_eq!(ready_from_provisioning_state(Some("Failed")).reason, "Unavailable");
    assert_eq!(ready_from_provisioning_state(Some("Updating")).reason, "Creating");
    assert_eq!(ready_from_provisioning_state(None).reason, "Creating");
}

#[test]
fn test_optional_matches() {
    assert!(optional_matches::<String>(None, None));
    assert!(optional_matches(None, Some(&"1.2".to_string())));
    assert!(optional_matches(Some(&"1.2".to_string()), Some(&"1.2".to_string())));
    assert!(!optional_matches(Some(&"1.2".to_string()), None));
}

#[test]
fn test_external_name_falls_back_to_metadata_name() {
    let group = ResourceGroup::new("rg", Default::default());
    assert_eq!(external_name(&group), "rg");

    let mut group = group;
    group.metadata.annotations = Some(BTreeMap::from([(
        "azure.microscaler.io/external-name".to_string(),
        "rg-prod".to_string(),
    )]));
    assert_eq!(external_name(&group), "rg-prod");
}

#[test]
fn test_found() {
    assert_eq!(found(Ok::<_, AzureError>(1)).unwrap(), Some(1));
    assert_eq!(
        found::<i32>(Err(AzureError::NotFound("ResourceNotFound".to_string()))).unwrap(),
        None
    );
    assert!(found::<i32>(Err(AzureError::Authentication("403".to_string()))).is_err());
}
