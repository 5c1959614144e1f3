//! Azure REST client
//!
//! Implements [`AzureClientTrait`] over the ARM REST API and Microsoft Graph
//! v1.0. Each resource provider is pinned to one `api-version`.

use crate::azure_trait::AzureClientTrait;
use crate::common::{Accepted, RestClient, with_api_version};
use crate::error::AzureError;
use crate::ids;
use crate::lro::{OperationStatus, PollerToken};
use crate::models::*;
use azure_core::credentials::TokenCredential;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const RESOURCES_API: &str = "2021-04-01";
const NETWORK_API: &str = "2023-09-01";
const REDIS_API: &str = "2023-08-01";
const STORAGE_API: &str = "2023-01-01";
const DNS_API: &str = "2018-05-01";
const SQL_API: &str = "2017-12-01";
const IOT_HUB_API: &str = "2023-06-30";
const CONTAINER_SERVICE_API: &str = "2024-05-01";
const AUTHORIZATION_API: &str = "2022-04-01";

/// Public-cloud ARM endpoint
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
/// Public-cloud Microsoft Graph endpoint
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com";

/// Service endpoints the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEndpoints {
    pub management: String,
    pub graph: String,
}

impl Default for AzureEndpoints {
    fn default() -> Self {
        Self {
            management: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            graph: DEFAULT_GRAPH_ENDPOINT.to_string(),
        }
    }
}

/// Azure API client
#[derive(Debug)]
pub struct AzureClient {
    arm: RestClient,
    graph: RestClient,
    subscription_id: String,
}

impl AzureClient {
    /// Create a new Azure client
    ///
    /// # Arguments
    /// * `credential` - Token source for both ARM and Graph
    /// * `subscription_id` - Subscription all ARM calls are scoped to
    /// * `endpoints` - ARM and Graph base URLs
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        subscription_id: String,
        endpoints: &AzureEndpoints,
    ) -> Result<Self, AzureError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            arm: RestClient::new(client.clone(), &endpoints.management, Arc::clone(&credential)),
            graph: RestClient::new(client, &endpoints.graph, credential),
            subscription_id,
        })
    }

    fn sub(&self) -> &str {
        &self.subscription_id
    }

    async fn arm_get<T: serde::de::DeserializeOwned>(&self, id: &str, api: &str) -> Result<T, AzureError> {
        self.arm.get(&with_api_version(id, api)).await
    }

    async fn arm_put<B: serde::Serialize>(&self, id: &str, api: &str, body: &B) -> Result<(), AzureError> {
        let _: Accepted<Value> = self.arm.begin_put(&with_api_version(id, api), body, &[]).await?;
        Ok(())
    }

    async fn arm_patch<B: serde::Serialize>(&self, id: &str, api: &str, body: &B) -> Result<(), AzureError> {
        let _: Accepted<Value> = self.arm.begin_patch(&with_api_version(id, api), body).await?;
        Ok(())
    }

    async fn arm_delete(&self, id: &str, api: &str) -> Result<(), AzureError> {
        self.arm.delete(&with_api_version(id, api)).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl AzureClientTrait for AzureClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, AzureError> {
        self.arm_get(&ids::resource_group(self.sub(), name), RESOURCES_API).await
    }

    async fn create_or_update_resource_group(&self, name: &str, group: &ResourceGroup) -> Result<ResourceGroup, AzureError> {
        let path = with_api_version(&ids::resource_group(self.sub(), name), RESOURCES_API);
        self.arm.put(&path, group).await
    }

    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::resource_group(self.sub(), name), RESOURCES_API).await
    }

    async fn get_virtual_network(&self, resource_group: &str, name: &str) -> Result<VirtualNetwork, AzureError> {
        self.arm_get(&ids::virtual_network(self.sub(), resource_group, name), NETWORK_API).await
    }

    async fn create_or_update_virtual_network(&self, resource_group: &str, name: &str, vnet: &VirtualNetwork) -> Result<(), AzureError> {
        self.arm_put(&ids::virtual_network(self.sub(), resource_group, name), NETWORK_API, vnet).await
    }

    async fn delete_virtual_network(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::virtual_network(self.sub(), resource_group, name), NETWORK_API).await
    }

    async fn get_subnet(&self, resource_group: &str, vnet: &str, name: &str) -> Result<Subnet, AzureError> {
        self.arm_get(&ids::subnet(self.sub(), resource_group, vnet, name), NETWORK_API).await
    }

    async fn create_or_update_subnet(&self, resource_group: &str, vnet: &str, name: &str, subnet: &Subnet) -> Result<(), AzureError> {
        self.arm_put(&ids::subnet(self.sub(), resource_group, vnet, name), NETWORK_API, subnet).await
    }

    async fn delete_subnet(&self, resource_group: &str, vnet: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::subnet(self.sub(), resource_group, vnet, name), NETWORK_API).await
    }

    async fn get_redis(&self, resource_group: &str, name: &str) -> Result<RedisResource, AzureError> {
        self.arm_get(&ids::redis(self.sub(), resource_group, name), REDIS_API).await
    }

    async fn create_redis(&self, resource_group: &str, name: &str, redis: &RedisResource) -> Result<(), AzureError> {
        self.arm_put(&ids::redis(self.sub(), resource_group, name), REDIS_API, redis).await
    }

    async fn update_redis(&self, resource_group: &str, name: &str, redis: &RedisResource) -> Result<(), AzureError> {
        self.arm_patch(&ids::redis(self.sub(), resource_group, name), REDIS_API, redis).await
    }

    async fn delete_redis(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::redis(self.sub(), resource_group, name), REDIS_API).await
    }

    async fn list_redis_keys(&self, resource_group: &str, name: &str) -> Result<RedisAccessKeys, AzureError> {
        let path = format!("{}/listKeys", ids::redis(self.sub(), resource_group, name));
        self.arm.post::<Value, _>(&with_api_version(&path, REDIS_API), None).await
    }

    async fn get_storage_account(&self, resource_group: &str, name: &str) -> Result<StorageAccount, AzureError> {
        self.arm_get(&ids::storage_account(self.sub(), resource_group, name), STORAGE_API).await
    }

    async fn create_storage_account(&self, resource_group: &str, name: &str, account: &StorageAccount) -> Result<(), AzureError> {
        self.arm_put(&ids::storage_account(self.sub(), resource_group, name), STORAGE_API, account).await
    }

    async fn update_storage_account(&self, resource_group: &str, name: &str, account: &StorageAccount) -> Result<(), AzureError> {
        self.arm_patch(&ids::storage_account(self.sub(), resource_group, name), STORAGE_API, account).await
    }

    async fn delete_storage_account(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::storage_account(self.sub(), resource_group, name), STORAGE_API).await
    }

    async fn list_storage_account_keys(&self, resource_group: &str, name: &str) -> Result<StorageAccountListKeysResult, AzureError> {
        let path = format!("{}/listKeys", ids::storage_account(self.sub(), resource_group, name));
        self.arm.post::<Value, _>(&with_api_version(&path, STORAGE_API), None).await
    }

    async fn get_dns_zone(&self, resource_group: &str, name: &str) -> Result<Zone, AzureError> {
        self.arm_get(&ids::dns_zone(self.sub(), resource_group, name), DNS_API).await
    }

    async fn create_or_update_dns_zone(&self, resource_group: &str, name: &str, zone: &Zone) -> Result<Zone, AzureError> {
        let path = with_api_version(&ids::dns_zone(self.sub(), resource_group, name), DNS_API);
        self.arm.put(&path, zone).await
    }

    async fn delete_dns_zone(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::dns_zone(self.sub(), resource_group, name), DNS_API).await
    }

    async fn get_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str) -> Result<SqlServer, AzureError> {
        self.arm_get(&ids::sql_server(engine, self.sub(), resource_group, name), SQL_API).await
    }

    async fn create_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str, server: &SqlServer) -> Result<(), AzureError> {
        self.arm_put(&ids::sql_server(engine, self.sub(), resource_group, name), SQL_API, server).await
    }

    async fn update_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str, server: &SqlServer) -> Result<(), AzureError> {
        self.arm_patch(&ids::sql_server(engine, self.sub(), resource_group, name), SQL_API, server).await
    }

    async fn delete_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::sql_server(engine, self.sub(), resource_group, name), SQL_API).await
    }

    async fn get_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<FirewallRule, AzureError> {
        self.arm_get(&ids::sql_firewall_rule(engine, self.sub(), resource_group, server, name), SQL_API).await
    }

    async fn create_or_update_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str, rule: &FirewallRule) -> Result<(), AzureError> {
        self.arm_put(&ids::sql_firewall_rule(engine, self.sub(), resource_group, server, name), SQL_API, rule).await
    }

    async fn delete_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::sql_firewall_rule(engine, self.sub(), resource_group, server, name), SQL_API).await
    }

    async fn get_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<VirtualNetworkRule, AzureError> {
        self.arm_get(&ids::sql_virtual_network_rule(engine, self.sub(), resource_group, server, name), SQL_API).await
    }

    async fn create_or_update_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str, rule: &VirtualNetworkRule) -> Result<(), AzureError> {
        self.arm_put(&ids::sql_virtual_network_rule(engine, self.sub(), resource_group, server, name), SQL_API, rule).await
    }

    async fn delete_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::sql_virtual_network_rule(engine, self.sub(), resource_group, server, name), SQL_API).await
    }

    async fn get_iot_hub(&self, resource_group: &str, name: &str) -> Result<IotHubDescription, AzureError> {
        self.arm_get(&ids::iot_hub(self.sub(), resource_group, name), IOT_HUB_API).await
    }

    async fn update_iot_hub(&self, resource_group: &str, name: &str, hub: &IotHubDescription, if_match: Option<&str>) -> Result<(), AzureError> {
        let path = with_api_version(&ids::iot_hub(self.sub(), resource_group, name), IOT_HUB_API);
        let headers: Vec<(&str, &str)> = if_match.map(|etag| ("If-Match", etag)).into_iter().collect();
        let _: Accepted<Value> = self.arm.begin_put(&path, hub, &headers).await?;
        Ok(())
    }

    async fn get_managed_cluster(&self, resource_group: &str, name: &str) -> Result<ManagedCluster, AzureError> {
        self.arm_get(&ids::managed_cluster(self.sub(), resource_group, name), CONTAINER_SERVICE_API).await
    }

    async fn begin_create_or_update_managed_cluster(&self, resource_group: &str, name: &str, cluster: &ManagedCluster) -> Result<Option<PollerToken>, AzureError> {
        let path = with_api_version(&ids::managed_cluster(self.sub(), resource_group, name), CONTAINER_SERVICE_API);
        let accepted: Accepted<Value> = self.arm.begin_put(&path, cluster, &[]).await?;
        Ok(accepted.poller)
    }

    async fn begin_update_agent_pool(&self, resource_group: &str, cluster: &str, pool: &str, agent_pool: &AgentPool) -> Result<Option<PollerToken>, AzureError> {
        let path = with_api_version(&ids::agent_pool(self.sub(), resource_group, cluster, pool), CONTAINER_SERVICE_API);
        let accepted: Accepted<Value> = self.arm.begin_put(&path, agent_pool, &[]).await?;
        Ok(accepted.poller)
    }

    async fn begin_delete_managed_cluster(&self, resource_group: &str, name: &str) -> Result<Option<PollerToken>, AzureError> {
        let path = with_api_version(&ids::managed_cluster(self.sub(), resource_group, name), CONTAINER_SERVICE_API);
        self.arm.delete(&path).await
    }

    async fn list_cluster_admin_credentials(&self, resource_group: &str, name: &str) -> Result<CredentialResults, AzureError> {
        let path = format!("{}/listClusterAdminCredential", ids::managed_cluster(self.sub(), resource_group, name));
        self.arm.post::<Value, _>(&with_api_version(&path, CONTAINER_SERVICE_API), None).await
    }

    async fn poll_operation(&self, token: &PollerToken) -> Result<OperationStatus, AzureError> {
        self.arm.poll(token).await
    }

    async fn find_application_by_display_name(&self, display_name: &str) -> Result<Option<Application>, AzureError> {
        let filter = format!("displayName eq '{}'", display_name.replace('\'', "''"));
        let path = format!("/v1.0/applications?$filter={}", urlencoding::encode(&filter));
        debug!("Looking up application by display name: {}", display_name);
        let list: ListResponse<Application> = self.graph.get(&path).await?;
        Ok(list.value.into_iter().next())
    }

    async fn get_application(&self, object_id: &str) -> Result<Application, AzureError> {
        self.graph.get(&format!("/v1.0/applications/{object_id}")).await
    }

    async fn create_application(&self, application: &Application) -> Result<Application, AzureError> {
        self.graph.post("/v1.0/applications", Some(application)).await
    }

    async fn add_application_password(&self, object_id: &str, display_name: &str) -> Result<PasswordCredential, AzureError> {
        let body = json!({"passwordCredential": {"displayName": display_name}});
        self.graph
            .post(&format!("/v1.0/applications/{object_id}/addPassword"), Some(&body))
            .await
    }

    async fn delete_application(&self, object_id: &str) -> Result<(), AzureError> {
        self.graph.delete(&format!("/v1.0/applications/{object_id}")).await.map(|_| ())
    }

    async fn get_service_principal(&self, object_id: &str) -> Result<ServicePrincipal, AzureError> {
        self.graph.get(&format!("/v1.0/servicePrincipals/{object_id}")).await
    }

    async fn create_service_principal(&self, app_id: &str) -> Result<ServicePrincipal, AzureError> {
        let body = json!({"appId": app_id, "accountEnabled": true});
        self.graph.post("/v1.0/servicePrincipals", Some(&body)).await
    }

    async fn delete_service_principal(&self, object_id: &str) -> Result<(), AzureError> {
        self.graph.delete(&format!("/v1.0/servicePrincipals/{object_id}")).await.map(|_| ())
    }

    async fn get_role_assignment(&self, scope: &str, name: &str) -> Result<RoleAssignment, AzureError> {
        self.arm_get(&ids::role_assignment(scope, name), AUTHORIZATION_API).await
    }

    async fn create_role_assignment(&self, scope: &str, name: &str, assignment: &RoleAssignment) -> Result<RoleAssignment, AzureError> {
        let path = with_api_version(&ids::role_assignment(scope, name), AUTHORIZATION_API);
        self.arm.put(&path, assignment).await
    }

    async fn delete_role_assignment(&self, scope: &str, name: &str) -> Result<(), AzureError> {
        self.arm_delete(&ids::role_assignment(scope, name), AUTHORIZATION_API).await
    }
}
