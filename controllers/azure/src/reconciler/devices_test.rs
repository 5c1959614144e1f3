//! Unit tests for the IotHubEndpoint external client

use crate::error::ControllerError;
use crate::managed::ManagedKind;
use crate::reconciler::devices::{endpoint_up_to_date, find_endpoint};
use crate::test_utils::{TEST_NAMESPACE, TestContext};
use azure_client::mock::sample_iot_hub;
use azure_client::models::{IotHubDescription, RoutingEndpoint};
use azure_client::{AzureClientTrait, AzureError, ids};
use crds::*;
use std::collections::BTreeMap;

const CONNECTION_STRING: &str = "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=send;SharedAccessKey=abc";

fn endpoint(name: &str, endpoint_type: EndpointType) -> IotHubEndpoint {
    IotHubEndpoint::new(
        name,
        IotHubEndpointSpec {
            for_provider: IotHubEndpointParameters {
                resource_group_name: Some("rg".to_string()),
                iot_hub_name: "hub".to_string(),
                endpoint_type,
                connection_string_secret_ref: SecretKeySelector {
                    name: "sb".to_string(),
                    namespace: None,
                    key: "connection".to_string(),
                },
                ..Default::default()
            },
            ..Default::default()
        },
    )
}

/// Context with a fresh hub and the connection string secret in place
fn setup() -> (TestContext<IotHubEndpointObservation>, String) {
    let test = TestContext::<IotHubEndpointObservation>::new();
    let sub = test.azure.subscription_id().to_string();
    let hub_id = ids::iot_hub(&sub, "rg", "hub");
    test.azure.insert(&hub_id, &sample_iot_hub("westeurope"));
    test.secrets.insert(
        TEST_NAMESPACE,
        "sb",
        BTreeMap::from([("connection".to_string(), CONNECTION_STRING.as_bytes().to_vec())]),
    );
    (test, hub_id)
}

#[test]
fn test_masked_connection_string_is_not_drift() {
    let p = endpoint("events", EndpointType::ServiceBusQueue).spec.for_provider;
    let observed = RoutingEndpoint {
        name: "events".to_string(),
        id: Some("generated".to_string()),
        connection_string: Some("Endpoint=sb://****".to_string()),
        ..Default::default()
    };
    assert!(endpoint_up_to_date(&p, &observed));

    let observed = RoutingEndpoint {
        encoding: Some("avro".to_string()),
        ..observed
    };
    assert!(!endpoint_up_to_date(&p, &observed));
}

#[tokio::test]
async fn test_create_adds_endpoint_to_hub() {
    let (test, hub_id) = setup();
    let client = IotHubEndpoint::external(test.context());
    let cr = endpoint("events", EndpointType::ServiceBusQueue);

    assert!(!client.observe(&cr).await.unwrap().resource_exists);
    client.create(&cr).await.unwrap();

    let hub: IotHubDescription = test.azure.get(&hub_id).unwrap();
    let queues = hub.routing_endpoints("serviceBusQueues").unwrap();
    assert_eq!(queues.len(), 1);
    assert_eq!(queues[0].name, "events");
    assert!(hub.routing_endpoints("eventHubs").unwrap().is_empty());

    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.unwrap().reason, REASON_AVAILABLE);
    let at_provider = observation.at_provider.unwrap();
    assert_eq!(at_provider.endpoint_type, Some(EndpointType::ServiceBusQueue));
    assert!(at_provider.id.is_some());
    assert_ne!(at_provider.hub_etag.as_deref(), Some("AAAAAAAAAAA="));
}

#[tokio::test]
async fn test_type_change_moves_endpoint() {
    let (test, hub_id) = setup();
    let client = IotHubEndpoint::external(test.context());
    let mut cr = endpoint("events", EndpointType::ServiceBusQueue);
    client.create(&cr).await.unwrap();

    cr.spec.for_provider.endpoint_type = EndpointType::ServiceBusTopic;
    assert!(!client.observe(&cr).await.unwrap().resource_up_to_date);
    client.update(&cr).await.unwrap();

    let hub: IotHubDescription = test.azure.get(&hub_id).unwrap();
    assert!(hub.routing_endpoints("serviceBusQueues").unwrap().is_empty());
    let (endpoint_type, _) = find_endpoint(&hub, "events").unwrap().unwrap();
    assert_eq!(endpoint_type, EndpointType::ServiceBusTopic);
    assert!(client.observe(&cr).await.unwrap().resource_up_to_date);
}

#[tokio::test]
async fn test_missing_connection_secret() {
    let test = TestContext::<IotHubEndpointObservation>::new();
    let sub = test.azure.subscription_id().to_string();
    test.azure
        .insert(&ids::iot_hub(&sub, "rg", "hub"), &sample_iot_hub("westeurope"));
    let client = IotHubEndpoint::external(test.context());

    let err = client
        .create(&endpoint("events", EndpointType::EventHub))
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::Secret(_)));
    assert_eq!(test.azure.call_count("update_iot_hub"), 0);
}

#[tokio::test]
async fn test_concurrent_hub_change_surfaces_error() {
    let (test, _) = setup();
    let client = IotHubEndpoint::external(test.context());
    let cr = endpoint("events", EndpointType::EventHub);

    test.azure.fail_next(
        "update_iot_hub",
        AzureError::from_response(412, "PreconditionFailed", "etag mismatch"),
    );
    assert!(client.create(&cr).await.is_err());
    assert!(!client.observe(&cr).await.unwrap().resource_exists);

    client.create(&cr).await.unwrap();
    assert!(client.observe(&cr).await.unwrap().resource_exists);
}

#[tokio::test]
async fn test_delete_removes_only_this_endpoint() {
    let (test, hub_id) = setup();
    let client = IotHubEndpoint::external(test.context());
    let first = endpoint("first", EndpointType::EventHub);
    let second = endpoint("second", EndpointType::EventHub);
    client.create(&first).await.unwrap();
    client.create(&second).await.unwrap();

    client.delete(&first).await.unwrap();
    let hub: IotHubDescription = test.azure.get(&hub_id).unwrap();
    let names: Vec<String> = hub
        .routing_endpoints("eventHubs")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["second".to_string()]);

    let updates = test.azure.call_count("update_iot_hub");
    client.delete(&first).await.unwrap();
    assert_eq!(test.azure.call_count("update_iot_hub"), updates);
}
