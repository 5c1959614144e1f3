//! Unit tests for the managed reconcile driver's decisions

use crate::error::ControllerError;
use crate::managed::*;
use crate::reconcile_helpers::{finalizer_patch, status_patch};
use crds::*;
use serde_json::json;
use std::time::Duration;

const POLL: Duration = Duration::from_secs(300);

fn group(policy: DeletionPolicy, finalized: bool) -> ResourceGroup {
    let mut group = ResourceGroup::new(
        "rg",
        ResourceGroupSpec {
            deletion_policy: policy,
            ..Default::default()
        },
    );
    if finalized {
        group.metadata.finalizers = Some(vec![MANAGED_FINALIZER.to_string()]);
    }
    group
}

fn condition<'a>(conditions: &'a [Condition], type_: &str) -> &'a Condition {
    get_condition(conditions, type_).unwrap()
}

#[test]
fn test_next_step() {
    let missing = ExternalObservation::<()>::missing();
    assert_eq!(next_step(&missing), Step::Create);
    assert_eq!(next_step(&ExternalObservation::exists((), Condition::available(), false)), Step::Update);
    assert_eq!(next_step(&ExternalObservation::exists((), Condition::available(), true)), Step::Observe);
}

#[test]
fn test_create_reports_creating_and_synced() {
    let mut conditions = Vec::new();
    let requeue = settle(&mut conditions, Step::Create, None, false, POLL);

    assert_eq!(requeue, SHORT_WAIT);
    let ready = condition(&conditions, TYPE_READY);
    assert_eq!(ready.status, ConditionStatus::False);
    assert_eq!(ready.reason, REASON_CREATING);
    let synced = condition(&conditions, TYPE_SYNCED);
    assert_eq!(synced.status, ConditionStatus::True);
    assert_eq!(synced.reason, REASON_RECONCILE_SUCCESS);
}

#[test]
fn test_ready_resource_requeues_after_poll_interval() {
    let mut conditions = vec![Condition::creating()];
    let requeue = settle(&mut conditions, Step::Observe, Some(Condition::available()), true, POLL);
    assert_eq!(requeue, POLL);
    assert_eq!(condition(&conditions, TYPE_READY).reason, REASON_AVAILABLE);
}

#[test]
fn test_provisioning_resource_requeues_soon() {
    let mut conditions = Vec::new();
    let requeue = settle(&mut conditions, Step::Observe, Some(Condition::creating()), true, POLL);
    assert_eq!(requeue, SHORT_WAIT);

    let mut conditions = vec![Condition::available()];
    let requeue = settle(&mut conditions, Step::Update, Some(Condition::available()), false, POLL);
    assert_eq!(requeue, SHORT_WAIT);
}

#[test]
fn test_missing_ready_keeps_current() {
    let mut conditions = vec![Condition::available()];
    settle(&mut conditions, Step::Observe, None, true, POLL);
    assert_eq!(condition(&conditions, TYPE_READY).reason, REASON_AVAILABLE);
}

#[test]
fn test_settled_status_is_not_rewritten() {
    let mut conditions = Vec::new();
    settle(&mut conditions, Step::Observe, Some(Condition::available()), true, POLL);
    let observation = json!({"id": "/subscriptions/s/resourceGroups/rg"});
    let current = json!({
        "conditions": serde_json::to_value(&conditions).unwrap(),
        "atProvider": observation.clone(),
    });

    let mut again = conditions.clone();
    settle(&mut again, Step::Observe, Some(Condition::available()), true, POLL);
    assert_eq!(again, conditions);
    assert!(status_patch(&current, &again, Some(&observation)).unwrap().is_none());

    let changed = json!({"id": "/subscriptions/s/resourceGroups/rg", "provisioningState": "Deleting"});
    assert!(status_patch(&current, &again, Some(&changed)).unwrap().is_some());
}

#[test]
fn test_orphan_releases_without_azure() {
    let cr = group(DeletionPolicy::Orphan, true);
    assert_eq!(deletion(&cr), Deletion::Orphan);
    assert_eq!(finalizer_patch(&cr, false), json!({"metadata": {"finalizers": []}}));

    assert_eq!(deletion(&group(DeletionPolicy::Delete, true)), Deletion::External);
    assert_eq!(deletion(&group(DeletionPolicy::Orphan, false)), Deletion::Released);
    assert_eq!(deletion(&group(DeletionPolicy::Delete, false)), Deletion::Released);
}

#[test]
fn test_deleting_conditions() {
    let conditions = deleting_conditions(&[Condition::available(), Condition::reconcile_success()]);
    let ready = condition(&conditions, TYPE_READY);
    assert_eq!(ready.status, ConditionStatus::False);
    assert_eq!(ready.reason, REASON_DELETING);
    assert_eq!(condition(&conditions, TYPE_SYNCED).reason, REASON_RECONCILE_SUCCESS);
}

#[test]
fn test_error_marks_not_synced_and_keeps_ready() {
    let error = ControllerError::Unresolved("resourceGroupName".to_string());
    let conditions = error_conditions(&[Condition::available(), Condition::reconcile_success()], &error);

    let synced = condition(&conditions, TYPE_SYNCED);
    assert_eq!(synced.status, ConditionStatus::False);
    assert_eq!(synced.reason, REASON_RECONCILE_ERROR);
    assert_eq!(synced.message.as_deref(), Some("resourceGroupName is not set and has no reference"));
    assert_eq!(condition(&conditions, TYPE_READY).reason, REASON_AVAILABLE);
}
