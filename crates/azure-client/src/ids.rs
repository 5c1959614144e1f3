//! ARM resource ID builders
//!
//! IDs double as request paths, so the client and the mock share them.

use crate::models::SqlEngine;

pub fn resource_group(subscription: &str, resource_group: &str) -> String {
    format!("/subscriptions/{subscription}/resourceGroups/{resource_group}")
}

fn provider_resource(
    subscription: &str,
    resource_group_name: &str,
    provider: &str,
    kind: &str,
    name: &str,
) -> String {
    format!(
        "{}/providers/{provider}/{kind}/{name}",
        resource_group(subscription, resource_group_name)
    )
}

pub fn virtual_network(subscription: &str, resource_group: &str, name: &str) -> String {
    provider_resource(subscription, resource_group, "Microsoft.Network", "virtualNetworks", name)
}

pub fn subnet(subscription: &str, resource_group: &str, vnet: &str, name: &str) -> String {
    format!("{}/subnets/{name}", virtual_network(subscription, resource_group, vnet))
}

pub fn redis(subscription: &str, resource_group: &str, name: &str) -> String {
    provider_resource(subscription, resource_group, "Microsoft.Cache", "redis", name)
}

pub fn storage_account(subscription: &str, resource_group: &str, name: &str) -> String {
    provider_resource(subscription, resource_group, "Microsoft.Storage", "storageAccounts", name)
}

pub fn dns_zone(subscription: &str, resource_group: &str, name: &str) -> String {
    provider_resource(subscription, resource_group, "Microsoft.Network", "dnsZones", name)
}

pub fn sql_server(engine: SqlEngine, subscription: &str, resource_group: &str, name: &str) -> String {
    provider_resource(subscription, resource_group, engine.provider(), "servers", name)
}

pub fn sql_firewall_rule(
    engine: SqlEngine,
    subscription: &str,
    resource_group: &str,
    server: &str,
    name: &str,
) -> String {
    format!(
        "{}/firewallRules/{name}",
        sql_server(engine, subscription, resource_group, server)
    )
}

pub fn sql_virtual_network_rule(
    engine: SqlEngine,
    subscription: &str,
    resource_group: &str,
    server: &str,
    name: &str,
) -> String {
    format!(
        "{}/virtualNetworkRules/{name}",
        sql_server(engine, subscription, resource_group, server)
    )
}

pub fn iot_hub(subscription: &str, resource_group: &str, name: &str) -> String {
    provider_resource(subscription, resource_group, "Microsoft.Devices", "IotHubs", name)
}

pub fn managed_cluster(subscription: &str, resource_group: &str, name: &str) -> String {
    provider_resource(
        subscription,
        resource_group,
        "Microsoft.ContainerService",
        "managedClusters",
        name,
    )
}

pub fn agent_pool(subscription: &str, resource_group: &str, cluster: &str, name: &str) -> String {
    format!("{}/agentPools/{name}", managed_cluster(subscription, resource_group, cluster))
}

pub fn role_assignment(scope: &str, name: &str) -> String {
    format!(
        "{}/providers/Microsoft.Authorization/roleAssignments/{name}",
        scope.trim_end_matches('/')
    )
}

pub fn role_definition(subscription: &str, role_id: &str) -> String {
    format!("/subscriptions/{subscription}/providers/Microsoft.Authorization/roleDefinitions/{role_id}")
}

/// Last path segment of an ARM ID
pub fn name_from_id(id: &str) -> Option<&str> {
    id.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        assert_eq!(
            subnet("s", "rg", "vnet", "default"),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default"
        );
        assert_eq!(
            sql_firewall_rule(SqlEngine::PostgreSql, "s", "rg", "db", "office"),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.DBforPostgreSQL/servers/db/firewallRules/office"
        );
        assert_eq!(
            role_assignment("/subscriptions/s/", "abc"),
            "/subscriptions/s/providers/Microsoft.Authorization/roleAssignments/abc"
        );
    }

    #[test]
    fn test_name_from_id() {
        assert_eq!(name_from_id(&redis("s", "rg", "cache")), Some("cache"));
        assert_eq!(name_from_id(""), None);
    }
}
