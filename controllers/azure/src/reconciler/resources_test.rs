//! Unit tests for the ResourceGroup external client

use crate::managed::ManagedKind;
use crate::test_utils::{TestContext, with_external_name};
use azure_client::{AzureClientTrait, AzureError, ids};
use crds::{REASON_AVAILABLE, ResourceGroup, ResourceGroupObservation, ResourceGroupParameters, ResourceGroupSpec};
use std::collections::BTreeMap;

fn group(name: &str) -> ResourceGroup {
    ResourceGroup::new(
        name,
        ResourceGroupSpec {
            for_provider: ResourceGroupParameters {
                location: "westeurope".to_string(),
                tags: BTreeMap::from([("env".to_string(), "test".to_string())]),
            },
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_observe_missing_then_create() {
    let test = TestContext::<ResourceGroupObservation>::new();
    let client = ResourceGroup::external(test.context());
    let cr = group("rg");

    let observation = client.observe(&cr).await.unwrap();
    assert!(!observation.resource_exists);

    client.create(&cr).await.unwrap();
    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.unwrap().reason, REASON_AVAILABLE);
    let at_provider = observation.at_provider.unwrap();
    assert_eq!(at_provider.provisioning_state.as_deref(), Some("Succeeded"));
    assert!(at_provider.id.unwrap().ends_with("/resourceGroups/rg"));
}

#[tokio::test]
async fn test_external_name_is_used() {
    let test = TestContext::<ResourceGroupObservation>::new();
    let client = ResourceGroup::external(test.context());
    let cr = with_external_name(group("rg"), "rg-prod-weu");

    client.create(&cr).await.unwrap();
    let sub = test.azure.subscription_id().to_string();
    assert!(test.azure.contains(&ids::resource_group(&sub, "rg-prod-weu")));
    assert!(!test.azure.contains(&ids::resource_group(&sub, "rg")));
}

#[tokio::test]
async fn test_tag_drift_is_updated() {
    let test = TestContext::<ResourceGroupObservation>::new();
    let client = ResourceGroup::external(test.context());
    let cr = group("rg");
    client.create(&cr).await.unwrap();

    let sub = test.azure.subscription_id().to_string();
    test.azure.modify(&ids::resource_group(&sub, "rg"), |v| {
        v["tags"] = serde_json::json!({"env": "prod"});
    });
    assert!(!client.observe(&cr).await.unwrap().resource_up_to_date);

    client.update(&cr).await.unwrap();
    assert!(client.observe(&cr).await.unwrap().resource_up_to_date);
}

#[tokio::test]
async fn test_delete_tolerates_missing_group() {
    let test = TestContext::<ResourceGroupObservation>::new();
    let client = ResourceGroup::external(test.context());
    client.delete(&group("rg")).await.unwrap();
    assert_eq!(test.azure.call_count("delete_resource_group"), 1);
}

#[tokio::test]
async fn test_observe_surfaces_other_errors() {
    let test = TestContext::<ResourceGroupObservation>::new();
    let client = ResourceGroup::external(test.context());
    test.azure.fail_next(
        "get_resource_group",
        AzureError::Authentication("403 AuthorizationFailed".to_string()),
    );
    assert!(client.observe(&group("rg")).await.is_err());
}
