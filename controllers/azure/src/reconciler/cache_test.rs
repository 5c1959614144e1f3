//! Unit tests for the Redis external client

use crate::connection::keys;
use crate::managed::ManagedKind;
use crate::reconciler::cache::{cache_up_to_date, desired_cache};
use crate::test_utils::TestContext;
use azure_client::{AzureClientTrait, ids};
use crds::*;
use std::collections::BTreeMap;

fn redis(name: &str) -> Redis {
    Redis::new(
        name,
        RedisSpec {
            for_provider: RedisParameters {
                resource_group_name: Some("rg".to_string()),
                location: "westeurope".to_string(),
                sku: RedisSku {
                    name: RedisSkuName::Standard,
                    family: RedisSkuFamily::C,
                    capacity: 1,
                },
                redis_configuration: BTreeMap::from([(
                    "maxmemory-policy".to_string(),
                    "allkeys-lru".to_string(),
                )]),
                ..Default::default()
            },
            ..Default::default()
        },
    )
}

#[test]
fn test_configuration_compares_only_spec_keys() {
    let p = redis("cache").spec.for_provider;
    let mut observed = desired_cache(&p);
    observed
        .properties
        .redis_configuration
        .insert("maxclients".to_string(), serde_json::json!("1000"));
    assert!(cache_up_to_date(&p, &observed));

    observed
        .properties
        .redis_configuration
        .insert("maxmemory-policy".to_string(), serde_json::json!("volatile-lru"));
    assert!(!cache_up_to_date(&p, &observed));
}

#[test]
fn test_sku_change_is_drift() {
    let mut p = redis("cache").spec.for_provider;
    let observed = desired_cache(&p);
    p.sku.capacity = 2;
    assert!(!cache_up_to_date(&p, &observed));
}

#[tokio::test]
async fn test_create_then_publish_connection_details() {
    let test = TestContext::<RedisObservation>::new();
    let client = Redis::external(test.context());
    let cr = redis("cache");

    assert!(!client.observe(&cr).await.unwrap().resource_exists);
    client.create(&cr).await.unwrap();

    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.as_ref().unwrap().reason, REASON_AVAILABLE);
    let at_provider = observation.at_provider.as_ref().unwrap();
    assert_eq!(at_provider.host_name.as_deref(), Some("cache.redis.cache.windows.net"));
    assert_eq!(at_provider.ssl_port, Some(6380));

    let details = &observation.connection_details;
    assert_eq!(details[keys::ENDPOINT], b"cache.redis.cache.windows.net".to_vec());
    assert_eq!(details[keys::PORT], b"6380".to_vec());
    assert_eq!(details[keys::PASSWORD], b"redis-primary-key".to_vec());
}

#[tokio::test]
async fn test_no_keys_while_provisioning() {
    let test = TestContext::<RedisObservation>::new();
    let client = Redis::external(test.context());
    let cr = redis("cache");
    client.create(&cr).await.unwrap();

    let sub = test.azure.subscription_id().to_string();
    test.azure.set_provisioning_state(&ids::redis(&sub, "rg", "cache"), "Creating");

    let observation = client.observe(&cr).await.unwrap();
    assert_eq!(observation.ready.unwrap().reason, REASON_CREATING);
    assert!(observation.connection_details.is_empty());
    assert_eq!(test.azure.call_count("list_redis_keys"), 0);
}

#[tokio::test]
async fn test_update_waits_for_succeeded() {
    let test = TestContext::<RedisObservation>::new();
    let client = Redis::external(test.context());
    let mut cr = redis("cache");
    client.create(&cr).await.unwrap();

    let sub = test.azure.subscription_id().to_string();
    let id = ids::redis(&sub, "rg", "cache");
    cr.spec.for_provider.sku.capacity = 2;

    test.azure.set_provisioning_state(&id, "Scaling");
    client.update(&cr).await.unwrap();
    assert_eq!(test.azure.call_count("update_redis"), 0);

    test.azure.set_provisioning_state(&id, "Succeeded");
    client.update(&cr).await.unwrap();
    assert_eq!(test.azure.call_count("update_redis"), 1);
    assert!(client.observe(&cr).await.unwrap().resource_up_to_date);
}
