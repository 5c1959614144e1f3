//! Integration tests for the Azure client
//!
//! These tests talk to a real subscription. Set AZURE_AUTH_FILE to the path of
//! an `az ad sp create-for-rbac --sdk-auth` JSON file and AZURE_TEST_RESOURCE_GROUP
//! to a scratch resource group name to run them.

use azure_client::auth::{build_credential, CredentialSource, SdkAuthCredentials};
use azure_client::{AzureClient, AzureClientTrait, AzureEndpoints, ResourceGroup, Zone};
use std::collections::BTreeMap;

fn client() -> AzureClient {
    let path = std::env::var("AZURE_AUTH_FILE")
        .expect("AZURE_AUTH_FILE environment variable must be set");
    let data = std::fs::read(path).expect("Failed to read auth file");
    let creds = SdkAuthCredentials::parse(&data).expect("Invalid auth file");
    let credential =
        build_credential(&CredentialSource::from(&creds)).expect("Failed to build credential");
    AzureClient::new(credential, creds.subscription_id, &AzureEndpoints::default())
        .expect("Failed to create client")
}

fn test_group() -> String {
    std::env::var("AZURE_TEST_RESOURCE_GROUP")
        .unwrap_or_else(|_| "azure-provider-integration".to_string())
}

#[tokio::test]
#[ignore] // Requires Azure credentials
async fn test_missing_resource_group_is_not_found() {
    let client = client();
    let err = client
        .get_resource_group("azure-provider-does-not-exist")
        .await
        .expect_err("resource group should not exist");
    assert!(err.is_not_found(), "unexpected error: {err}");
}

#[tokio::test]
#[ignore]
async fn test_resource_group_lifecycle() {
    let client = client();
    let name = test_group();

    let mut tags = BTreeMap::new();
    tags.insert("purpose".to_string(), "integration-test".to_string());
    let group = ResourceGroup {
        location: "westeurope".to_string(),
        tags,
        ..Default::default()
    };

    let created = client
        .create_or_update_resource_group(&name, &group)
        .await
        .expect("Failed to create resource group");
    assert_eq!(created.provisioning_state(), Some("Succeeded"));

    let fetched = client.get_resource_group(&name).await.expect("Failed to get resource group");
    assert_eq!(fetched.tags.get("purpose").map(String::as_str), Some("integration-test"));
}

#[tokio::test]
#[ignore]
async fn test_dns_zone_lifecycle() {
    let client = client();
    let group = test_group();
    let zone_name = "azure-provider-integration.example";

    let zone = Zone {
        location: "global".to_string(),
        ..Default::default()
    };
    let created = client
        .create_or_update_dns_zone(&group, zone_name, &zone)
        .await
        .expect("Failed to create DNS zone");
    assert!(!created.properties.name_servers.is_empty());

    client
        .delete_dns_zone(&group, zone_name)
        .await
        .expect("Failed to delete DNS zone");
}
