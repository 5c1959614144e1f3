//! Unit tests for the storage Account external client

use crate::error::ControllerError;
use crate::managed::ManagedKind;
use crate::reconciler::storage::{account_up_to_date, desired_account, endpoint_suffix, storage_keys};
use crate::test_utils::{TestContext, with_external_name};
use crds::*;

fn account(name: &str) -> Account {
    Account::new(
        name,
        AccountSpec {
            for_provider: AccountParameters {
                resource_group_name: Some("rg".to_string()),
                location: "westeurope".to_string(),
                sku_name: "Standard_LRS".to_string(),
                enable_https_traffic_only: true,
                access_tier: Some(AccessTier::Hot),
                ..Default::default()
            },
            ..Default::default()
        },
    )
}

#[test]
fn test_endpoint_suffix_from_blob_endpoint() {
    assert_eq!(
        endpoint_suffix("acct", Some("https://acct.blob.core.chinacloudapi.cn/")),
        "core.chinacloudapi.cn"
    );
    assert_eq!(endpoint_suffix("acct", None), "core.windows.net");
    assert_eq!(endpoint_suffix("acct", Some("not-a-url")), "core.windows.net");
}

#[test]
fn test_access_tier_change_is_drift() {
    let mut p = account("acct").spec.for_provider;
    let observed = desired_account(&p);
    assert!(account_up_to_date(&p, &observed));

    p.access_tier = Some(AccessTier::Cool);
    assert!(!account_up_to_date(&p, &observed));
}

#[tokio::test]
async fn test_invalid_name_rejected_before_create() {
    let test = TestContext::<AccountObservation>::new();
    let client = Account::external(test.context());
    let cr = with_external_name(account("acct"), "Not_Valid");

    let err = client.create(&cr).await.unwrap_err();
    assert!(matches!(err, ControllerError::Crd(CrdError::InvalidName { .. })));
    assert_eq!(test.azure.call_count("create_storage_account"), 0);
}

#[tokio::test]
async fn test_create_then_publish_connection_details() {
    let test = TestContext::<AccountObservation>::new();
    let client = Account::external(test.context());
    let cr = account("acct01");

    assert!(!client.observe(&cr).await.unwrap().resource_exists);
    client.create(&cr).await.unwrap();

    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.as_ref().unwrap().reason, REASON_AVAILABLE);
    let at_provider = observation.at_provider.as_ref().unwrap();
    assert_eq!(at_provider.status_of_primary.as_deref(), Some("available"));

    let details = &observation.connection_details;
    assert_eq!(details[storage_keys::ACCOUNT_NAME], b"acct01".to_vec());
    assert_eq!(details[storage_keys::ACCOUNT_KEY], b"storage-key-1".to_vec());
    assert_eq!(
        details[storage_keys::BLOB_ENDPOINT],
        b"https://acct01.blob.core.windows.net/".to_vec()
    );
    assert_eq!(
        String::from_utf8(details[storage_keys::CONNECTION_STRING].clone()).unwrap(),
        "DefaultEndpointsProtocol=https;AccountName=acct01;AccountKey=storage-key-1;EndpointSuffix=core.windows.net"
    );
}

#[tokio::test]
async fn test_update_patches_tags() {
    let test = TestContext::<AccountObservation>::new();
    let client = Account::external(test.context());
    let mut cr = account("acct01");
    client.create(&cr).await.unwrap();

    cr.spec
        .for_provider
        .tags
        .insert("team".to_string(), "data".to_string());
    assert!(!client.observe(&cr).await.unwrap().resource_up_to_date);

    client.update(&cr).await.unwrap();
    assert_eq!(test.azure.call_count("update_storage_account"), 1);
    assert!(client.observe(&cr).await.unwrap().resource_up_to_date);

    client.delete(&cr).await.unwrap();
    client.delete(&cr).await.unwrap();
    assert!(!client.observe(&cr).await.unwrap().resource_exists);
}
