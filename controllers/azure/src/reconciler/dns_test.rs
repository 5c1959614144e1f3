//! Unit tests for the DnsZone external client

use crate::managed::ManagedKind;
use crate::reconciler::dns::desired_zone;
use crate::test_utils::{TestContext, with_external_name};
use azure_client::{AzureClientTrait, ids, models};
use crds::*;

fn zone(name: &str) -> DnsZone {
    DnsZone::new(
        name,
        DnsZoneSpec {
            for_provider: DnsZoneParameters {
                resource_group_name: Some("rg".to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
    )
}

#[test]
fn test_zone_is_global() {
    let mut p = zone("example").spec.for_provider;
    p.zone_type = ZoneType::Private;
    let body = desired_zone(&p);
    assert_eq!(body.location, "global");
    assert_eq!(body.properties.zone_type.as_deref(), Some("Private"));
}

#[tokio::test]
async fn test_zone_lifecycle() {
    let test = TestContext::<DnsZoneObservation>::new();
    let client = DnsZone::external(test.context());
    let mut cr = with_external_name(zone("example"), "example.com");

    assert!(!client.observe(&cr).await.unwrap().resource_exists);
    client.create(&cr).await.unwrap();

    let sub = test.azure.subscription_id().to_string();
    let stored: models::Zone = test.azure.get(&ids::dns_zone(&sub, "rg", "example.com")).unwrap();
    assert_eq!(stored.location, models::DNS_ZONE_LOCATION);

    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.unwrap().reason, REASON_AVAILABLE);
    let at_provider = observation.at_provider.unwrap();
    assert_eq!(at_provider.name_servers.len(), 2);
    assert_eq!(at_provider.max_number_of_record_sets, Some(10000));

    cr.spec
        .for_provider
        .tags
        .insert("env".to_string(), "prod".to_string());
    assert!(!client.observe(&cr).await.unwrap().resource_up_to_date);
    client.update(&cr).await.unwrap();
    assert!(client.observe(&cr).await.unwrap().resource_up_to_date);

    client.delete(&cr).await.unwrap();
    assert!(!client.observe(&cr).await.unwrap().resource_exists);
}
