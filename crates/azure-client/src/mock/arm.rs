//! AzureClientTrait implementation for the mock

use super::graph::{application_key, service_principal_key};
use super::{MockAzureClient, PendingEffect};
use crate::azure_trait::AzureClientTrait;
use crate::error::AzureError;
use crate::ids;
use crate::lro::{OperationStatus, PollerToken};
use crate::models::*;
use serde_json::{Value, json};
use std::collections::HashSet;

/// Base64 of a minimal kubeconfig
pub const MOCK_KUBECONFIG_B64: &str = "YXBpVmVyc2lvbjogdjEKa2luZDogQ29uZmlnCg==";

#[async_trait::async_trait]
impl AzureClientTrait for MockAzureClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, AzureError> {
        self.enter("get_resource_group")?;
        self.load(&ids::resource_group(self.sub(), name))
    }

    async fn create_or_update_resource_group(&self, name: &str, group: &ResourceGroup) -> Result<ResourceGroup, AzureError> {
        self.enter("create_or_update_resource_group")?;
        let value = self.store(&ids::resource_group(self.sub(), name), group, Some("Succeeded"))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError> {
        self.enter("delete_resource_group")?;
        self.delete_existing(&ids::resource_group(self.sub(), name))
    }

    async fn get_virtual_network(&self, resource_group: &str, name: &str) -> Result<VirtualNetwork, AzureError> {
        self.enter("get_virtual_network")?;
        let id = ids::virtual_network(self.sub(), resource_group, name);
        let mut vnet: VirtualNetwork = self.load(&id)?;
        vnet.properties.subnets = Some(self.child_subnets(&id).into_iter().map(|(_, s)| s).collect());
        Ok(vnet)
    }

    async fn create_or_update_virtual_network(&self, resource_group: &str, name: &str, vnet: &VirtualNetwork) -> Result<(), AzureError> {
        self.enter("create_or_update_virtual_network")?;
        let mut vnet = vnet.clone();
        vnet.etag = Some(format!("W/\"{}\"", self.new_guid()));
        vnet.r#type = Some("Microsoft.Network/virtualNetworks".to_string());
        if vnet.properties.resource_guid.is_none() {
            vnet.properties.resource_guid = Some(self.new_guid());
        }
        let id = ids::virtual_network(self.sub(), resource_group, name);
        let listed: Vec<Value> = vnet.properties.subnets.take().unwrap_or_default();
        self.store(&id, &vnet, Some("Succeeded"))?;

        // The PUT body owns the subnet list: unlisted subnets are dropped
        let names: HashSet<String> = listed
            .iter()
            .filter_map(|s| s.get("name").and_then(Value::as_str))
            .map(str::to_ascii_lowercase)
            .collect();
        for (subnet_id, _) in self.child_subnets(&id) {
            if ids::name_from_id(&subnet_id).is_none_or(|n| !names.contains(n)) {
                self.remove(&subnet_id);
            }
        }
        for subnet in &listed {
            if let Some(n) = subnet.get("name").and_then(Value::as_str) {
                let subnet_id = ids::subnet(self.sub(), resource_group, name, n);
                if !self.contains(&subnet_id) {
                    self.store(&subnet_id, subnet, Some("Succeeded"))?;
                }
            }
        }
        Ok(())
    }

    async fn delete_virtual_network(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_virtual_network")?;
        self.delete_existing(&ids::virtual_network(self.sub(), resource_group, name))
    }

    async fn get_subnet(&self, resource_group: &str, vnet: &str, name: &str) -> Result<Subnet, AzureError> {
        self.enter("get_subnet")?;
        self.load(&ids::subnet(self.sub(), resource_group, vnet, name))
    }

    async fn create_or_update_subnet(&self, resource_group: &str, vnet: &str, name: &str, subnet: &Subnet) -> Result<(), AzureError> {
        self.enter("create_or_update_subnet")?;
        if !self.contains(&ids::virtual_network(self.sub(), resource_group, vnet)) {
            return Err(AzureError::NotFound(format!("ParentResourceNotFound: {vnet}")));
        }
        let mut subnet = subnet.clone();
        subnet.etag = Some(format!("W/\"{}\"", self.new_guid()));
        self.store(&ids::subnet(self.sub(), resource_group, vnet, name), &subnet, Some("Succeeded"))?;
        Ok(())
    }

    async fn delete_subnet(&self, resource_group: &str, vnet: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_subnet")?;
        self.delete_existing(&ids::subnet(self.sub(), resource_group, vnet, name))
    }

    async fn get_redis(&self, resource_group: &str, name: &str) -> Result<RedisResource, AzureError> {
        self.enter("get_redis")?;
        self.load(&ids::redis(self.sub(), resource_group, name))
    }

    async fn create_redis(&self, resource_group: &str, name: &str, redis: &RedisResource) -> Result<(), AzureError> {
        self.enter("create_redis")?;
        let mut redis = redis.clone();
        redis.properties.host_name = Some(format!("{name}.redis.cache.windows.net"));
        redis.properties.port = Some(6379);
        redis.properties.ssl_port = Some(6380);
        redis.properties.redis_version = Some("6.0".to_string());
        self.store(&ids::redis(self.sub(), resource_group, name), &redis, Some("Succeeded"))?;
        Ok(())
    }

    async fn update_redis(&self, resource_group: &str, name: &str, redis: &RedisResource) -> Result<(), AzureError> {
        self.enter("update_redis")?;
        self.merge(&ids::redis(self.sub(), resource_group, name), redis)
    }

    async fn delete_redis(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_redis")?;
        self.delete_existing(&ids::redis(self.sub(), resource_group, name))
    }

    async fn list_redis_keys(&self, resource_group: &str, name: &str) -> Result<RedisAccessKeys, AzureError> {
        self.enter("list_redis_keys")?;
        let _: RedisResource = self.load(&ids::redis(self.sub(), resource_group, name))?;
        Ok(RedisAccessKeys {
            primary_key: "redis-primary-key".to_string(),
            secondary_key: "redis-secondary-key".to_string(),
        })
    }

    async fn get_storage_account(&self, resource_group: &str, name: &str) -> Result<StorageAccount, AzureError> {
        self.enter("get_storage_account")?;
        self.load(&ids::storage_account(self.sub(), resource_group, name))
    }

    async fn create_storage_account(&self, resource_group: &str, name: &str, account: &StorageAccount) -> Result<(), AzureError> {
        self.enter("create_storage_account")?;
        let mut account = account.clone();
        account.properties.primary_endpoints = Some(Endpoints {
            blob: Some(format!("https://{name}.blob.core.windows.net/")),
            queue: Some(format!("https://{name}.queue.core.windows.net/")),
            table: Some(format!("https://{name}.table.core.windows.net/")),
            file: Some(format!("https://{name}.file.core.windows.net/")),
            web: None,
            dfs: None,
        });
        account.properties.status_of_primary = Some("available".to_string());
        self.store(&ids::storage_account(self.sub(), resource_group, name), &account, Some("Succeeded"))?;
        Ok(())
    }

    async fn update_storage_account(&self, resource_group: &str, name: &str, account: &StorageAccount) -> Result<(), AzureError> {
        self.enter("update_storage_account")?;
        self.merge(&ids::storage_account(self.sub(), resource_group, name), account)
    }

    async fn delete_storage_account(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_storage_account")?;
        self.delete_existing(&ids::storage_account(self.sub(), resource_group, name))
    }

    async fn list_storage_account_keys(&self, resource_group: &str, name: &str) -> Result<StorageAccountListKeysResult, AzureError> {
        self.enter("list_storage_account_keys")?;
        let _: StorageAccount = self.load(&ids::storage_account(self.sub(), resource_group, name))?;
        Ok(StorageAccountListKeysResult {
            keys: vec![
                StorageAccountKey {
                    key_name: "key1".to_string(),
                    value: "storage-key-1".to_string(),
                    permissions: Some("FULL".to_string()),
                },
                StorageAccountKey {
                    key_name: "key2".to_string(),
                    value: "storage-key-2".to_string(),
                    permissions: Some("FULL".to_string()),
                },
            ],
        })
    }

    async fn get_dns_zone(&self, resource_group: &str, name: &str) -> Result<Zone, AzureError> {
        self.enter("get_dns_zone")?;
        self.load(&ids::dns_zone(self.sub(), resource_group, name))
    }

    async fn create_or_update_dns_zone(&self, resource_group: &str, name: &str, zone: &Zone) -> Result<Zone, AzureError> {
        self.enter("create_or_update_dns_zone")?;
        let mut zone = zone.clone();
        zone.etag = Some(self.new_guid());
        zone.properties.name_servers = vec![
            "ns1-01.azure-dns.com.".to_string(),
            "ns2-01.azure-dns.net.".to_string(),
        ];
        zone.properties.number_of_record_sets = Some(2);
        zone.properties.max_number_of_record_sets = Some(10000);
        let value = self.store(&ids::dns_zone(self.sub(), resource_group, name), &zone, None)?;
        Ok(serde_json::from_value(value)?)
    }

    async fn delete_dns_zone(&self, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_dns_zone")?;
        self.delete_existing(&ids::dns_zone(self.sub(), resource_group, name))
    }

    async fn get_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str) -> Result<SqlServer, AzureError> {
        self.enter("get_sql_server")?;
        self.load(&ids::sql_server(engine, self.sub(), resource_group, name))
    }

    async fn create_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str, server: &SqlServer) -> Result<(), AzureError> {
        self.enter("create_sql_server")?;
        if server.properties.administrator_login_password.is_none() {
            return Err(AzureError::from_response(400, "PasswordNotComplex", "administrator password required"));
        }
        let mut server = server.clone();
        server.properties.administrator_login_password = None;
        server.properties.create_mode = None;
        server.properties.user_visible_state = Some("Ready".to_string());
        let suffix = match engine {
            SqlEngine::MySql => "mysql",
            SqlEngine::PostgreSql => "postgres",
        };
        server.properties.fully_qualified_domain_name =
            Some(format!("{name}.{suffix}.database.azure.com"));
        self.store(&ids::sql_server(engine, self.sub(), resource_group, name), &server, None)?;
        Ok(())
    }

    async fn update_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str, server: &SqlServer) -> Result<(), AzureError> {
        self.enter("update_sql_server")?;
        self.merge(&ids::sql_server(engine, self.sub(), resource_group, name), server)
    }

    async fn delete_sql_server(&self, engine: SqlEngine, resource_group: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_sql_server")?;
        self.delete_existing(&ids::sql_server(engine, self.sub(), resource_group, name))
    }

    async fn get_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<FirewallRule, AzureError> {
        self.enter("get_firewall_rule")?;
        self.load(&ids::sql_firewall_rule(engine, self.sub(), resource_group, server, name))
    }

    async fn create_or_update_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str, rule: &FirewallRule) -> Result<(), AzureError> {
        self.enter("create_or_update_firewall_rule")?;
        let mut rule = rule.clone();
        rule.r#type = Some(format!("{}/servers/firewallRules", engine.provider()));
        self.store(&ids::sql_firewall_rule(engine, self.sub(), resource_group, server, name), &rule, None)?;
        Ok(())
    }

    async fn delete_firewall_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_firewall_rule")?;
        self.delete_existing(&ids::sql_firewall_rule(engine, self.sub(), resource_group, server, name))
    }

    async fn get_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<VirtualNetworkRule, AzureError> {
        self.enter("get_virtual_network_rule")?;
        self.load(&ids::sql_virtual_network_rule(engine, self.sub(), resource_group, server, name))
    }

    async fn create_or_update_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str, rule: &VirtualNetworkRule) -> Result<(), AzureError> {
        self.enter("create_or_update_virtual_network_rule")?;
        let mut rule = rule.clone();
        rule.r#type = Some(format!("{}/servers/virtualNetworkRules", engine.provider()));
        rule.properties.state = Some("Ready".to_string());
        self.store(&ids::sql_virtual_network_rule(engine, self.sub(), resource_group, server, name), &rule, None)?;
        Ok(())
    }

    async fn delete_virtual_network_rule(&self, engine: SqlEngine, resource_group: &str, server: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_virtual_network_rule")?;
        self.delete_existing(&ids::sql_virtual_network_rule(engine, self.sub(), resource_group, server, name))
    }

    async fn get_iot_hub(&self, resource_group: &str, name: &str) -> Result<IotHubDescription, AzureError> {
        self.enter("get_iot_hub")?;
        self.load(&ids::iot_hub(self.sub(), resource_group, name))
    }

    async fn update_iot_hub(&self, resource_group: &str, name: &str, hub: &IotHubDescription, if_match: Option<&str>) -> Result<(), AzureError> {
        self.enter("update_iot_hub")?;
        let id = ids::iot_hub(self.sub(), resource_group, name);
        let current: IotHubDescription = self.load(&id)?;
        if let Some(etag) = if_match {
            if current.etag.as_deref() != Some(etag) {
                return Err(AzureError::from_response(
                    412,
                    "PreconditionFailed",
                    "the hub was modified concurrently",
                ));
            }
        }
        let mut hub = hub.clone();
        hub.etag = Some(self.new_guid());
        // Azure masks connection strings on read
        for list in ["eventHubs", "serviceBusQueues", "serviceBusTopics", "storageContainers"] {
            let mut endpoints = hub.routing_endpoints(list)?;
            if endpoints.is_empty() {
                continue;
            }
            for endpoint in &mut endpoints {
                if endpoint.id.is_none() {
                    endpoint.id = Some(self.new_guid());
                }
                endpoint.connection_string = endpoint
                    .connection_string
                    .as_ref()
                    .map(|_| "Endpoint=sb://****".to_string());
            }
            hub.set_routing_endpoints(list, &endpoints)?;
        }
        self.store(&id, &hub, None)?;
        Ok(())
    }

    async fn get_managed_cluster(&self, resource_group: &str, name: &str) -> Result<ManagedCluster, AzureError> {
        self.enter("get_managed_cluster")?;
        self.load(&ids::managed_cluster(self.sub(), resource_group, name))
    }

    async fn begin_create_or_update_managed_cluster(&self, resource_group: &str, name: &str, cluster: &ManagedCluster) -> Result<Option<PollerToken>, AzureError> {
        self.enter("begin_create_or_update_managed_cluster")?;
        let id = ids::managed_cluster(self.sub(), resource_group, name);
        let mut cluster = cluster.clone();
        if let Some(sp) = cluster.properties.service_principal_profile.as_mut() {
            sp.secret = None;
        }
        let prefix = cluster.properties.dns_prefix.clone().unwrap_or_else(|| name.to_string());
        cluster.properties.fqdn = Some(format!("{prefix}.hcp.{}.azmk8s.io", cluster.location));
        self.store(&id, &cluster, Some("Creating"))?;
        Ok(Some(self.start_operation(PendingEffect::Provision(id))))
    }

    async fn begin_update_agent_pool(&self, resource_group: &str, cluster: &str, pool: &str, agent_pool: &AgentPool) -> Result<Option<PollerToken>, AzureError> {
        self.enter("begin_update_agent_pool")?;
        let id = ids::managed_cluster(self.sub(), resource_group, cluster);
        let mut current: ManagedCluster = self.load(&id)?;
        let profile = current
            .properties
            .agent_pool_profiles
            .iter_mut()
            .find(|p| p.name == pool)
            .ok_or_else(|| AzureError::NotFound(format!("agent pool {pool}")))?;
        profile.count = agent_pool.properties.count.or(profile.count);
        if let Some(size) = &agent_pool.properties.vm_size {
            profile.vm_size = Some(size.clone());
        }
        self.store(&id, &current, Some("Updating"))?;
        Ok(Some(self.start_operation(PendingEffect::Provision(id))))
    }

    async fn begin_delete_managed_cluster(&self, resource_group: &str, name: &str) -> Result<Option<PollerToken>, AzureError> {
        self.enter("begin_delete_managed_cluster")?;
        let id = ids::managed_cluster(self.sub(), resource_group, name);
        if !self.contains(&id) {
            return Err(AzureError::NotFound(format!("ResourceNotFound: {id}")));
        }
        self.set_provisioning_state(&id, "Deleting");
        Ok(Some(self.start_operation(PendingEffect::Remove(id))))
    }

    async fn list_cluster_admin_credentials(&self, resource_group: &str, name: &str) -> Result<CredentialResults, AzureError> {
        self.enter("list_cluster_admin_credentials")?;
        let _: ManagedCluster = self.load(&ids::managed_cluster(self.sub(), resource_group, name))?;
        Ok(CredentialResults {
            kubeconfigs: vec![CredentialResult {
                name: "clusterAdmin".to_string(),
                value: MOCK_KUBECONFIG_B64.to_string(),
            }],
        })
    }

    async fn poll_operation(&self, token: &PollerToken) -> Result<OperationStatus, AzureError> {
        self.enter("poll_operation")?;
        let finished = {
            let mut state = self.lock();
            let Some(operation) = state.operations.get_mut(&token.url) else {
                return Err(AzureError::NotFound(format!("operation {}", token.url)));
            };
            if operation.polls_left > 0 {
                operation.polls_left -= 1;
                return Ok(OperationStatus::InProgress);
            }
            state.operations.remove(&token.url)
        };
        let Some(operation) = finished else {
            return Ok(OperationStatus::Succeeded);
        };
        match (operation.failure, operation.effect) {
            (Some(message), PendingEffect::Provision(id)) => {
                self.set_provisioning_state(&id, "Failed");
                Ok(OperationStatus::Failed(message))
            }
            (Some(message), PendingEffect::Remove(_)) => Ok(OperationStatus::Failed(message)),
            (None, PendingEffect::Provision(id)) => {
                self.set_provisioning_state(&id, "Succeeded");
                Ok(OperationStatus::Succeeded)
            }
            (None, PendingEffect::Remove(id)) => {
                self.remove(&id);
                Ok(OperationStatus::Succeeded)
            }
        }
    }

    async fn find_application_by_display_name(&self, display_name: &str) -> Result<Option<Application>, AzureError> {
        self.enter("find_application_by_display_name")?;
        Ok(self.mock_find_application(display_name))
    }

    async fn get_application(&self, object_id: &str) -> Result<Application, AzureError> {
        self.enter("get_application")?;
        self.load(&application_key(object_id))
    }

    async fn create_application(&self, application: &Application) -> Result<Application, AzureError> {
        self.enter("create_application")?;
        self.mock_create_application(application)
    }

    async fn add_application_password(&self, object_id: &str, display_name: &str) -> Result<PasswordCredential, AzureError> {
        self.enter("add_application_password")?;
        self.mock_add_password(object_id, display_name)
    }

    async fn delete_application(&self, object_id: &str) -> Result<(), AzureError> {
        self.enter("delete_application")?;
        self.delete_existing(&application_key(object_id))
    }

    async fn get_service_principal(&self, object_id: &str) -> Result<ServicePrincipal, AzureError> {
        self.enter("get_service_principal")?;
        self.load(&service_principal_key(object_id))
    }

    async fn create_service_principal(&self, app_id: &str) -> Result<ServicePrincipal, AzureError> {
        self.enter("create_service_principal")?;
        self.mock_create_service_principal(app_id)
    }

    async fn delete_service_principal(&self, object_id: &str) -> Result<(), AzureError> {
        self.enter("delete_service_principal")?;
        self.delete_existing(&service_principal_key(object_id))
    }

    async fn get_role_assignment(&self, scope: &str, name: &str) -> Result<RoleAssignment, AzureError> {
        self.enter("get_role_assignment")?;
        self.load(&ids::role_assignment(scope, name))
    }

    async fn create_role_assignment(&self, scope: &str, name: &str, assignment: &RoleAssignment) -> Result<RoleAssignment, AzureError> {
        self.enter("create_role_assignment")?;
        self.mock_create_role_assignment(scope, name, assignment)
    }

    async fn delete_role_assignment(&self, scope: &str, name: &str) -> Result<(), AzureError> {
        self.enter("delete_role_assignment")?;
        self.delete_existing(&ids::role_assignment(scope, name))
    }
}

/// Build a hub with empty routing, as Azure returns for a fresh S1 hub
pub fn sample_iot_hub(location: &str) -> IotHubDescription {
    IotHubDescription {
        location: location.to_string(),
        etag: Some("AAAAAAAAAAA=".to_string()),
        sku: json!({"name": "S1", "capacity": 1}),
        properties: json!({
            "routing": {
                "endpoints": {
                    "eventHubs": [],
                    "serviceBusQueues": [],
                    "serviceBusTopics": [],
                    "storageContainers": []
                },
                "routes": []
            }
        }),
        ..Default::default()
    }
}
