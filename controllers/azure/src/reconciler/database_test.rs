//! Unit tests for the database server and rule external clients

use crate::connection::keys;
use crate::error::ControllerError;
use crate::managed::ManagedKind;
use crate::password::PASSWORD_LENGTH;
use crate::reconciler::database::{desired_server, server_ready, server_up_to_date, sku_name};
use crate::test_utils::TestContext;
use azure_client::models::SqlEngine;
use azure_client::{AzureClientTrait, ids, models};
use crds::*;

fn server_params() -> SQLServerParameters {
    SQLServerParameters {
        resource_group_name: Some("rg".to_string()),
        location: "westeurope".to_string(),
        sku: SKU {
            tier: "GeneralPurpose".to_string(),
            capacity: 2,
            family: "Gen5".to_string(),
        },
        administrator_login: "admin".to_string(),
        version: "5.7".to_string(),
        storage_profile: StorageProfile {
            storage_mb: 51200,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn mysql(name: &str) -> MySQLServer {
    MySQLServer::new(
        name,
        MySQLServerSpec {
            for_provider: server_params(),
            ..Default::default()
        },
    )
}

fn postgres(name: &str) -> PostgreSQLServer {
    PostgreSQLServer::new(
        name,
        PostgreSQLServerSpec {
            for_provider: SQLServerParameters {
                version: "11".to_string(),
                ..server_params()
            },
            ..Default::default()
        },
    )
}

#[test]
fn test_sku_name_from_tier() {
    let mut sku = server_params().sku;
    assert_eq!(sku_name(&sku).unwrap(), "GP_Gen5_2");

    sku.tier = "Basic".to_string();
    sku.capacity = 1;
    assert_eq!(sku_name(&sku).unwrap(), "B_Gen5_1");

    sku.tier = "MemoryOptimized".to_string();
    assert_eq!(sku_name(&sku).unwrap(), "MO_Gen5_1");

    sku.tier = "Premium".to_string();
    assert!(matches!(sku_name(&sku), Err(ControllerError::InvalidSpec(_))));
}

#[test]
fn test_server_ready_from_visible_state() {
    assert_eq!(server_ready(Some("Ready")).reason, REASON_AVAILABLE);
    assert_eq!(server_ready(Some("Dropping")).reason, REASON_DELETING);
    assert_eq!(server_ready(Some("Disabled")).reason, REASON_CREATING);
    assert_eq!(server_ready(None).reason, REASON_CREATING);
}

#[test]
fn test_server_drift() {
    let p = server_params();
    let mut observed = desired_server(&p).unwrap();
    assert!(server_up_to_date(&p, &observed));

    observed.properties.storage_profile = Some(models::SqlStorageProfile {
        storage_mb: Some(102400),
        ..Default::default()
    });
    assert!(!server_up_to_date(&p, &observed));

    let mut observed = desired_server(&p).unwrap();
    observed.properties.ssl_enforcement = Some("Disabled".to_string());
    assert!(!server_up_to_date(&p, &observed));
}

#[tokio::test]
async fn test_create_publishes_generated_password() {
    let test = TestContext::<SQLServerObservation>::new();
    let client = MySQLServer::external(test.context());
    let cr = mysql("db");

    assert!(!client.observe(&cr).await.unwrap().resource_exists);
    let creation = client.create(&cr).await.unwrap();
    let password = &creation.connection_details[keys::PASSWORD];
    assert_eq!(password.len(), PASSWORD_LENGTH);
    assert_eq!(creation.connection_details[keys::USERNAME], b"admin@db".to_vec());

    let sub = test.azure.subscription_id().to_string();
    let stored: models::SqlServer = test
        .azure
        .get(&ids::sql_server(SqlEngine::MySql, &sub, "rg", "db"))
        .unwrap();
    assert!(stored.properties.administrator_login_password.is_none());

    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.unwrap().reason, REASON_AVAILABLE);
    let details = &observation.connection_details;
    assert_eq!(details[keys::ENDPOINT], b"db.mysql.database.azure.com".to_vec());
    assert_eq!(details[keys::PORT], b"3306".to_vec());
    assert!(!details.contains_key(keys::PASSWORD));
}

#[tokio::test]
async fn test_postgres_uses_its_own_provider() {
    let test = TestContext::<SQLServerObservation>::new();
    let client = PostgreSQLServer::external(test.context());
    let cr = postgres("pg");
    client.create(&cr).await.unwrap();

    let sub = test.azure.subscription_id().to_string();
    assert!(test.azure.contains(&ids::sql_server(SqlEngine::PostgreSql, &sub, "rg", "pg")));
    assert!(!test.azure.contains(&ids::sql_server(SqlEngine::MySql, &sub, "rg", "pg")));

    let observation = client.observe(&cr).await.unwrap();
    assert_eq!(observation.connection_details[keys::PORT], b"5432".to_vec());
    assert_eq!(
        observation.connection_details[keys::USERNAME],
        b"admin@pg".to_vec()
    );
}

#[tokio::test]
async fn test_firewall_rule_lifecycle() {
    let test = TestContext::<FirewallRuleObservation>::new();
    let client = PostgreSQLServerFirewallRule::external(test.context());
    let mut cr = PostgreSQLServerFirewallRule::new(
        "office",
        PostgreSQLServerFirewallRuleSpec {
            for_provider: FirewallRuleParameters {
                resource_group_name: Some("rg".to_string()),
                server_name: Some("pg".to_string()),
                start_ip_address: "10.0.0.1".to_string(),
                end_ip_address: "10.0.0.1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        },
    );

    client.create(&cr).await.unwrap();
    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.unwrap().reason, REASON_AVAILABLE);
    assert_eq!(
        observation.at_provider.unwrap().r#type.as_deref(),
        Some("Microsoft.DBforPostgreSQL/servers/firewallRules")
    );

    cr.spec.for_provider.end_ip_address = "10.0.0.255".to_string();
    assert!(!client.observe(&cr).await.unwrap().resource_up_to_date);
    client.update(&cr).await.unwrap();
    assert!(client.observe(&cr).await.unwrap().resource_up_to_date);

    client.delete(&cr).await.unwrap();
    client.delete(&cr).await.unwrap();
}

#[tokio::test]
async fn test_vnet_rule_requires_subnet_id() {
    let test = TestContext::<VirtualNetworkRuleObservation>::new();
    let client = MySQLServerVirtualNetworkRule::external(test.context());
    let mut cr = MySQLServerVirtualNetworkRule::new(
        "aks",
        MySQLServerVirtualNetworkRuleSpec {
            for_provider: VirtualNetworkRuleParameters {
                resource_group_name: Some("rg".to_string()),
                server_name: Some("db".to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
    );

    let err = client.create(&cr).await.unwrap_err();
    assert!(matches!(err, ControllerError::Unresolved(ref f) if f == "virtualNetworkSubnetId"));

    let sub = test.azure.subscription_id().to_string();
    cr.spec.for_provider.virtual_network_subnet_id = Some(ids::subnet(&sub, "rg", "vnet", "sn"));
    client.create(&cr).await.unwrap();

    let observation = client.observe(&cr).await.unwrap();
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.ready.unwrap().reason, REASON_AVAILABLE);
    assert_eq!(observation.at_provider.unwrap().state.as_deref(), Some("Ready"));
}
