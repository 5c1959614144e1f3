//! AzureClient trait for mocking
//!
//! The concrete [`AzureClient`](crate::AzureClient) implements this trait, and
//! controller tests use [`MockAzureClient`](crate::mock::MockAzureClient).
//! All methods return `AzureError::NotFound` when the addressed object does not
//! exist.

use crate::error::AzureError;
use crate::lro::{OperationStatus, PollerToken};
use crate::models::*;

/// Azure Resource Manager and Microsoft Graph operations used by the controllers
#[async_trait::async_trait]
pub trait AzureClientTrait: Send + Sync {
    /// Subscription this client operates in
    fn subscription_id(&self) -> &str;

    // Resource groups
    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, AzureError>;
    async fn create_or_update_resource_group(&self, name: &str, group: &ResourceGroup) -> Result<ResourceGroup, AzureError>;
    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError>;

    // Virtual networks
    async fn get_virtual_network(&self, resource_group: &str, name: &str) -> Result<VirtualNetwork, AzureError>;
    async fn create_or_update_virtual_network(&self, resource_group: &str, name: &str, vnet: &VirtualNetwork) -> Result<(), AzureError>;
    async fn delete_virtual_network(&self, resource_group: &str, name: &str) -> Result<(), AzureError>;
    async fn get_subnet(&self, resource_group: &str, vnet: &str, name: &str) -> Result<Subnet, AzureError>;
    async fn create_or_update_subnet(&self, resource_group: &str, vnet: &str, name: &str, subnet: &Subnet) -> Result<(), AzureError>;
    async fn delete_subnet(&self, resource_group: &str, vnet: &str, name: &str) -> Result<(), AzureError>;

    // Redis
    async fn get_redis(&self, resource_group: &str, name: &str) -> Result<RedisResource, AzureError>;
    async fn create_redis(&self, resource_group: &str, name: &str, redis: &RedisResource) -> Result<(), AzureError>;
    async fn update_redis(&self, resource_group: &str, name: &str, redis: &RedisResource) -> Result<(), AzureError>;
    async fn delete_redis(&self, resource_group: &str, name: &str) -> Result<(), AzureError>;
    async fn list_redis_keys(&self, resource_group: &str, name: &str) -> Result<RedisAccessKeys, AzureError>;

    // Storage accounts
    async fn get_storage_account(&self, resource_group: &str, name: &str) -> Result<StorageAccount, AzureError>;
    async fn create_storage_account(&self, resource_group: &str, name: &str, account: &StorageAccount) -> Result<(), AzureError>;
    async fn update_storage_account(&self, resource_group: &str, name: &str, account: &StorageAccount) -> Result<(), AzureError>;
    async fn delete_storage_account(&self, resource_group: &str, name: &str) -> Result<(), AzureError>;
    async fn list_storage_account_keys(&self, resource_group: &str, name: &str) -> Result<StorageAccountListKeysResult, AzureError>;

    // DNS zones
    async fn get_dns_zone(&self, resource_group: &str, name: &str) -> Result<Zone, AzureError>;
    async fn create_or_update_dns_zone(&self, resource_group: &str, name: &str, zone: &Zone) -> Result<Zone, AzureError>;
    async fn delete_dns_zone(&self, resource_group: &str, name: &str) -> Result<(), AzureError>;

    // MySQL / PostgreSQL servers
    async fn get_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str) -> Result<SqlServer, AzureError>;
    async fn create_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str, server: &SqlServer) -> Result<(), AzureError>;
    async fn update_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str, server: &SqlServer) -> Result<(), AzureError>;
    async fn delete_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str) -> Result<(), AzureError>;
    async fn get_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<FirewallRule, AzureError>;
    async fn create_or_update_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str, rule: &FirewallRule) -> Result<(), AzureError>;
    async fn delete_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<(), AzureError>;
    async fn get_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<VirtualNetworkRule, AzureError>;
    async fn create_or_update_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str, rule: &VirtualNetworkRule) -> Result<(), AzureError>;
    async fn delete_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<(), AzureError>;

    // IoT Hub
    async fn get_iot_hub(&self, resource_group: &str, name: &str) -> Result<IotHubDescription, AzureError>;
    /// Write the hub back; fails with 412 when `if_match` no longer matches
    async fn update_iot_hub(&self, resource_group: &str, name: &str, hub: &IotHubDescription, if_match: Option<&str>) -> Result<(), AzureError>;

    // AKS
    async fn get_managed_cluster(&self, resource_group: &str, name: &str) -> Result<ManagedCluster, AzureError>;
    async fn begin_create_or_update_managed_cluster(&self, resource_group: &str, name: &str, cluster: &ManagedCluster) -> Result<Option<PollerToken>, AzureError>;
    async fn begin_update_agent_pool(&self, resource_group: &str, cluster: &str, pool: &str, agent_pool: &AgentPool) -> Result<Option<PollerToken>, AzureError>;
    async fn begin_delete_managed_cluster(&self, resource_group: &str, name: &str) -> Result<Option<PollerToken>, AzureError>;
    async fn list_cluster_admin_credentials(&self, resource_group: &str, name: &str) -> Result<CredentialResults, AzureError>;
    async fn poll_operation(&self, token: &PollerToken) -> Result<OperationStatus, AzureError>;

    // Microsoft Graph
    async fn find_application_by_display_name(&self, display_name: &str) -> Result<Option<Application>, AzureError>;
    async fn get_application(&self, object_id: &str) -> Result<Application, AzureError>;
    async fn create_application(&self, application: &Application) -> Result<Application, AzureError>;
    async fn add_application_password(&self, object_id: &str, display_name: &str) -> Result<PasswordCredential, AzureError>;
    async fn delete_application(&self, object_id: &str) -> Result<(), AzureError>;
    async fn get_service_principal(&self, object_id: &str) -> Result<ServicePrincipal, AzureError>;
    async fn create_service_principal(&self, app_id: &str) -> Result<ServicePrincipal, AzureError>;
    async fn delete_service_principal(&self, object_id: &str) -> Result<(), AzureError>;

    // Role assignments
    async fn get_role_assignment(&self, scope: &str, name: &str) -> Result<RoleAssignment, AzureError>;
    async fn create_role_assignment(&self, scope: &str, name: &str, assignment: &RoleAssignment) -> Result<RoleAssignment, AzureError>;
    async fn delete_role_assignment(&self, scope: &str, name: &str) -> Result<(), AzureError>;
}
