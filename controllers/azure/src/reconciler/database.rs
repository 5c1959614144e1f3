//! Azure Database for MySQL / PostgreSQL reconcilers
//!
//! Handles: MySQLServer, PostgreSQLServer and their firewall and virtual
//! network rules. Both engines share parameter types, so each client is
//! generic over a kind trait that names the engine.

use crate::connection::{ConnectionDetails, details, keys};
use crate::error::ControllerError;
use crate::managed::{
    ExternalClient, ExternalContext, ExternalCreation, ExternalObservation, ExternalUpdate, ManagedKind,
};
use crate::password::generate_password;
use crate::reconcile_helpers::{eq_ignore_case, external_name, found, optional_matches, required};
use crate::references::{Resolved, Resolver};
use azure_client::error::ignore_not_found;
use azure_client::models::{self, SqlEngine};
use azure_client::AzureClientTrait;
use crds::{
    Condition, FirewallRuleObservation, FirewallRuleParameters, MySQLServer, MySQLServerFirewallRule,
    MySQLServerVirtualNetworkRule, PostgreSQLServer, PostgreSQLServerFirewallRule,
    PostgreSQLServerVirtualNetworkRule, ResourceGroup, SQLServerObservation, SQLServerParameters,
    SslEnforcement, VirtualNetworkRuleObservation, VirtualNetworkRuleParameters, SKU,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// A database server kind
pub trait SqlServerKind: ManagedKind<Observation = SQLServerObservation> {
    const ENGINE: SqlEngine;
    fn parameters(&self) -> &SQLServerParameters;
}

/// A server firewall rule kind
pub trait FirewallRuleKind: ManagedKind<Observation = FirewallRuleObservation> {
    const ENGINE: SqlEngine;
    fn parameters(&self) -> &FirewallRuleParameters;
}

/// A server virtual network rule kind
pub trait VirtualNetworkRuleKind: ManagedKind<Observation = VirtualNetworkRuleObservation> {
    const ENGINE: SqlEngine;
    fn parameters(&self) -> &VirtualNetworkRuleParameters;
}

macro_rules! sql_kinds {
    ($engine:expr, $server:ty, $firewall:ty, $vnet_rule:ty) => {
        impl SqlServerKind for $server {
            const ENGINE: SqlEngine = $engine;
            fn parameters(&self) -> &SQLServerParameters {
                &self.spec.for_provider
            }
        }

        #[async_trait::async_trait]
        impl ManagedKind for $server {
            async fn resolve_references(&self, resolver: &Resolver) -> Result<Resolved, ControllerError> {
                let p = &self.spec.for_provider;
                let mut resolved = Resolved::new();
                resolver
                    .name::<ResourceGroup>(
                        &mut resolved,
                        "resourceGroupName",
                        p.resource_group_name.as_deref(),
                        p.resource_group_name_ref.as_ref(),
                    )
                    .await?;
                Ok(resolved)
            }

            fn external(ctx: ExternalContext<SQLServerObservation>) -> Box<dyn ExternalClient<Self>> {
                Box::new(SqlServerClient::<Self>::new(ctx.azure))
            }
        }

        impl FirewallRuleKind for $firewall {
            const ENGINE: SqlEngine = $engine;
            fn parameters(&self) -> &FirewallRuleParameters {
                &self.spec.for_provider
            }
        }

        #[async_trait::async_trait]
        impl ManagedKind for $firewall {
            async fn resolve_references(&self, resolver: &Resolver) -> Result<Resolved, ControllerError> {
                let p = &self.spec.for_provider;
                let mut resolved = Resolved::new();
                resolver
                    .name::<ResourceGroup>(
                        &mut resolved,
                        "resourceGroupName",
                        p.resource_group_name.as_deref(),
                        p.resource_group_name_ref.as_ref(),
                    )
                    .await?;
                resolver
                    .name::<$server>(
                        &mut resolved,
                        "serverName",
                        p.server_name.as_deref(),
                        p.server_name_ref.as_ref(),
                    )
                    .await?;
                Ok(resolved)
            }

            fn external(ctx: ExternalContext<FirewallRuleObservation>) -> Box<dyn ExternalClient<Self>> {
                Box::new(FirewallRuleClient::<Self>::new(ctx.azure))
            }
        }

        impl VirtualNetworkRuleKind for $vnet_rule {
            const ENGINE: SqlEngine = $engine;
            fn parameters(&self) -> &VirtualNetworkRuleParameters {
                &self.spec.for_provider
            }
        }

        #[async_trait::async_trait]
        impl ManagedKind for $vnet_rule {
            async fn resolve_references(&self, resolver: &Resolver) -> Result<Resolved, ControllerError> {
                let p = &self.spec.for_provider;
                let mut resolved = Resolved::new();
                resolver
                    .name::<ResourceGroup>(
                        &mut resolved,
                        "resourceGroupName",
                        p.resource_group_name.as_deref(),
                        p.resource_group_name_ref.as_ref(),
                    )
                    .await?;
                resolver
                    .name::<$server>(
                        &mut resolved,
                        "serverName",
                        p.server_name.as_deref(),
                        p.server_name_ref.as_ref(),
                    )
                    .await?;
                resolver
                    .subnet_id(
                        &mut resolved,
                        "virtualNetworkSubnetId",
                        p.virtual_network_subnet_id.as_deref(),
                        p.virtual_network_subnet_id_ref.as_ref(),
                    )
                    .await?;
                Ok(resolved)
            }

            fn external(ctx: ExternalContext<VirtualNetworkRuleObservation>) -> Box<dyn ExternalClient<Self>> {
                Box::new(VirtualNetworkRuleClient::<Self>::new(ctx.azure))
            }
        }
    };
}

sql_kinds!(SqlEngine::MySql, MySQLServer, MySQLServerFirewallRule, MySQLServerVirtualNetworkRule);
sql_kinds!(
    SqlEngine::PostgreSql,
    PostgreSQLServer,
    PostgreSQLServerFirewallRule,
    PostgreSQLServerVirtualNetworkRule
);

// Servers

/// ARM SKU name: `<tier prefix>_<family>_<capacity>`, e.g. `GP_Gen5_2`
pub fn sku_name(sku: &SKU) -> Result<String, ControllerError> {
    let prefix = match sku.tier.as_str() {
        "Basic" => "B",
        "GeneralPurpose" => "GP",
        "MemoryOptimized" => "MO",
        other => return Err(ControllerError::InvalidSpec(format!("unknown SKU tier {other:?}"))),
    };
    Ok(format!("{}_{}_{}", prefix, sku.family, sku.capacity))
}

fn ssl_enforcement(value: SslEnforcement) -> &'static str {
    match value {
        SslEnforcement::Enabled => "Enabled",
        SslEnforcement::Disabled => "Disabled",
    }
}

fn desired_sku(p: &SQLServerParameters) -> Result<models::SqlSku, ControllerError> {
    Ok(models::SqlSku {
        name: sku_name(&p.sku)?,
        tier: Some(p.sku.tier.clone()),
        capacity: Some(p.sku.capacity),
        family: Some(p.sku.family.clone()),
    })
}

fn desired_storage(p: &SQLServerParameters) -> models::SqlStorageProfile {
    models::SqlStorageProfile {
        storage_mb: Some(p.storage_profile.storage_mb),
        backup_retention_days: p.storage_profile.backup_retention_days,
        geo_redundant_backup: p.storage_profile.geo_redundant_backup.clone(),
        storage_autogrow: p.storage_profile.storage_autogrow.clone(),
    }
}

/// Create body for a server; the caller fills in the administrator password
pub fn desired_server(p: &SQLServerParameters) -> Result<models::SqlServer, ControllerError> {
    Ok(models::SqlServer {
        location: p.location.clone(),
        tags: p.tags.clone(),
        sku: Some(desired_sku(p)?),
        properties: models::SqlServerProperties {
            create_mode: Some("Default".to_string()),
            administrator_login: Some(p.administrator_login.clone()),
            version: Some(p.version.clone()),
            ssl_enforcement: Some(ssl_enforcement(p.ssl_enforcement).to_string()),
            minimal_tls_version: p.minimal_tls_version.clone(),
            storage_profile: Some(desired_storage(p)),
            public_network_access: p.public_network_access.clone(),
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Whether the observed server matches the parameters
pub fn server_up_to_date(p: &SQLServerParameters, server: &models::SqlServer) -> bool {
    let props = &server.properties;
    let sku_matches = match (sku_name(&p.sku), server.sku.as_ref()) {
        (Ok(name), Some(sku)) => sku.name.eq_ignore_ascii_case(&name),
        _ => false,
    };
    let storage_matches = props.storage_profile.as_ref().is_some_and(|s| {
        let desired = &p.storage_profile;
        s.storage_mb == Some(desired.storage_mb)
            && optional_matches(desired.backup_retention_days.as_ref(), s.backup_retention_days.as_ref())
            && optional_matches(desired.geo_redundant_backup.as_ref(), s.geo_redundant_backup.as_ref())
            && optional_matches(desired.storage_autogrow.as_ref(), s.storage_autogrow.as_ref())
    });

    sku_matches
        && storage_matches
        && props.version.as_deref() == Some(p.version.as_str())
        && eq_ignore_case(ssl_enforcement(p.ssl_enforcement), props.ssl_enforcement.as_deref())
        && optional_matches(p.minimal_tls_version.as_ref(), props.minimal_tls_version.as_ref())
        && optional_matches(p.public_network_access.as_ref(), props.public_network_access.as_ref())
        && server.tags == p.tags
}

/// Ready condition for a server's `userVisibleState`
pub fn server_ready(state: Option<&str>) -> Condition {
    match state {
        Some("Ready") => Condition::available(),
        Some("Dropping") => Condition::deleting(),
        _ => Condition::creating(),
    }
}

/// Login name clients must use; both engines expect `login@server`
pub fn server_username(login: &str, server: &str) -> String {
    format!("{login}@{server}")
}

pub(crate) struct SqlServerClient<K> {
    azure: Arc<dyn AzureClientTrait>,
    kind: PhantomData<fn() -> K>,
}

impl<K> SqlServerClient<K> {
    fn new(azure: Arc<dyn AzureClientTrait>) -> Self {
        Self {
            azure,
            kind: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<K: SqlServerKind> ExternalClient<K> for SqlServerClient<K> {
    async fn observe(&self, cr: &K) -> Result<ExternalObservation<SQLServerObservation>, ControllerError> {
        let p = cr.parameters();
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let Some(server) = found(self.azure.get_sql_server(K::ENGINE, rg, &name).await)? else {
            return Ok(ExternalObservation::missing());
        };

        let props = &server.properties;
        let observation = SQLServerObservation {
            id: server.id.clone(),
            fully_qualified_domain_name: props.fully_qualified_domain_name.clone(),
            user_visible_state: props.user_visible_state.clone(),
            version: props.version.clone(),
        };
        let connection = details([
            (keys::USERNAME, Some(server_username(&p.administrator_login, &name))),
            (keys::ENDPOINT, props.fully_qualified_domain_name.clone()),
            (keys::PORT, Some(K::ENGINE.port().to_string())),
        ]);
        Ok(ExternalObservation::exists(
            observation,
            server_ready(props.user_visible_state.as_deref()),
            server_up_to_date(p, &server),
        )
        .with_connection_details(connection))
    }

    async fn create(&self, cr: &K) -> Result<ExternalCreation, ControllerError> {
        let p = cr.parameters();
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let name = external_name(cr);
        let password = generate_password();

        let mut server = desired_server(p)?;
        server.properties.administrator_login_password = Some(password.clone());
        self.azure.create_sql_server(K::ENGINE, rg, &name, &server).await?;

        let connection_details: ConnectionDetails = details([
            (keys::USERNAME, Some(server_username(&p.administrator_login, &name))),
            (keys::PASSWORD, Some(password)),
            (keys::PORT, Some(K::ENGINE.port().to_string())),
        ]);
        Ok(ExternalCreation {
            external_name: None,
            connection_details,
        })
    }

    async fn update(&self, cr: &K) -> Result<ExternalUpdate, ControllerError> {
        let p = cr.parameters();
        let rg = required(p.resource_group_name.as_deref(), "resourceGroupName")?;
        let patch = models::SqlServer {
            tags: p.tags.clone(),
            sku: Some(desired_sku(p)?),
            properties: models::SqlServerProperties {
                version: Some(p.version.clone()),
                ssl_enforcement: Some(ssl_enforcement(p.ssl_enforcement).to_string()),
                minimal_tls_version: p.minimal_tls_version.clone(),
                storage_profile: Some(desired_storage(p)),
                public_network_access: p.public_network_access.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        self.azure
            .update_sql_server(K::ENGINE, rg, &external_name(cr), &patch)
            .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &K) -> Result<(), ControllerError> {
        let rg = required(cr.parameters().resource_group_name.as_deref(), "resourceGroupName")?;
        ignore_not_found(self.azure.delete_sql_server(K::ENGINE, rg, &external_name(cr)).await)?;
        Ok(())
    }
}

// Firewall rules

fn rule_location<'a>(
    resource_group_name: Option<&'a str>,
    server_name: Option<&'a str>,
) -> Result<(&'a str, &'a str), ControllerError> {
    Ok((
        required(resource_group_name, "resourceGroupName")?,
        required(server_name, "serverName")?,
    ))
}

pub(crate) struct FirewallRuleClient<K> {
    azure: Arc<dyn AzureClientTrait>,
    kind: PhantomData<fn() -> K>,
}

impl<K> FirewallRuleClient<K> {
    fn new(azure: Arc<dyn AzureClientTrait>) -> Self {
        Self {
            azure,
            kind: PhantomData,
        }
    }

    async fn put(&self, engine: SqlEngine, p: &FirewallRuleParameters, name: &str) -> Result<(), ControllerError> {
        let (rg, server) = rule_location(p.resource_group_name.as_deref(), p.server_name.as_deref())?;
        let rule = models::FirewallRule {
            properties: models::FirewallRuleProperties {
                start_ip_address: p.start_ip_address.clone(),
                end_ip_address: p.end_ip_address.clone(),
            },
            ..Default::default()
        };
        self.azure
            .create_or_update_firewall_rule(engine, rg, server, name, &rule)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<K: FirewallRuleKind> ExternalClient<K> for FirewallRuleClient<K> {
    async fn observe(&self, cr: &K) -> Result<ExternalObservation<FirewallRuleObservation>, ControllerError> {
        let p = cr.parameters();
        let (rg, server) = rule_location(p.resource_group_name.as_deref(), p.server_name.as_deref())?;
        let Some(rule) = found(
            self.azure
                .get_firewall_rule(K::ENGINE, rg, server, &external_name(cr))
                .await,
        )?
        else {
            return Ok(ExternalObservation::missing());
        };

        let up_to_date = rule.properties.start_ip_address == p.start_ip_address
            && rule.properties.end_ip_address == p.end_ip_address;
        let observation = FirewallRuleObservation {
            id: rule.id,
            r#type: rule.r#type,
        };
        Ok(ExternalObservation::exists(observation, Condition::available(), up_to_date))
    }

    async fn create(&self, cr: &K) -> Result<ExternalCreation, ControllerError> {
        self.put(K::ENGINE, cr.parameters(), &external_name(cr)).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &K) -> Result<ExternalUpdate, ControllerError> {
        self.put(K::ENGINE, cr.parameters(), &external_name(cr)).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &K) -> Result<(), ControllerError> {
        let p = cr.parameters();
        let (rg, server) = rule_location(p.resource_group_name.as_deref(), p.server_name.as_deref())?;
        ignore_not_found(
            self.azure
                .delete_firewall_rule(K::ENGINE, rg, server, &external_name(cr))
                .await,
        )?;
        Ok(())
    }
}

// Virtual network rules

/// Ready condition for a virtual network rule's `state`
pub fn vnet_rule_ready(state: Option<&str>) -> Condition {
    match state {
        Some("Ready") => Condition::available(),
        Some("Deleting") => Condition::deleting(),
        _ => Condition::creating(),
    }
}

pub(crate) struct VirtualNetworkRuleClient<K> {
    azure: Arc<dyn AzureClientTrait>,
    kind: PhantomData<fn() -> K>,
}

impl<K> VirtualNetworkRuleClient<K> {
    fn new(azure: Arc<dyn AzureClientTrait>) -> Self {
        Self {
            azure,
            kind: PhantomData,
        }
    }

    async fn put(
        &self,
        engine: SqlEngine,
        p: &VirtualNetworkRuleParameters,
        name: &str,
    ) -> Result<(), ControllerError> {
        let (rg, server) = rule_location(p.resource_group_name.as_deref(), p.server_name.as_deref())?;
        let subnet_id = required(p.virtual_network_subnet_id.as_deref(), "virtualNetworkSubnetId")?;
        let rule = models::VirtualNetworkRule {
            properties: models::VirtualNetworkRuleProperties {
                virtual_network_subnet_id: subnet_id.to_string(),
                ignore_missing_vnet_service_endpoint: Some(p.ignore_missing_vnet_service_endpoint),
                state: None,
            },
            ..Default::default()
        };
        self.azure
            .create_or_update_virtual_network_rule(engine, rg, server, name, &rule)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<K: VirtualNetworkRuleKind> ExternalClient<K> for VirtualNetworkRuleClient<K> {
    async fn observe(
        &self,
        cr: &K,
    ) -> Result<ExternalObservation<VirtualNetworkRuleObservation>, ControllerError> {
        let p = cr.parameters();
        let (rg, server) = rule_location(p.resource_group_name.as_deref(), p.server_name.as_deref())?;
        let Some(rule) = found(
            self.azure
                .get_virtual_network_rule(K::ENGINE, rg, server, &external_name(cr))
                .await,
        )?
        else {
            return Ok(ExternalObservation::missing());
        };

        let props = &rule.properties;
        let up_to_date = p
            .virtual_network_subnet_id
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case(&props.virtual_network_subnet_id))
            && props.ignore_missing_vnet_service_endpoint.unwrap_or(false) == p.ignore_missing_vnet_service_endpoint;
        let observation = VirtualNetworkRuleObservation {
            id: rule.id.clone(),
            state: props.state.clone(),
            r#type: rule.r#type.clone(),
        };
        Ok(ExternalObservation::exists(
            observation,
            vnet_rule_ready(props.state.as_deref()),
            up_to_date,
        ))
    }

    async fn create(&self, cr: &K) -> Result<ExternalCreation, ControllerError> {
        self.put(K::ENGINE, cr.parameters(), &external_name(cr)).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, cr: &K) -> Result<ExternalUpdate, ControllerError> {
        self.put(K::ENGINE, cr.parameters(), &external_name(cr)).await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &K) -> Result<(), ControllerError> {
        let p = cr.parameters();
        let (rg, server) = rule_location(p.resource_group_name.as_deref(), p.server_name.as_deref())?;
        ignore_not_found(
            self.azure
                .delete_virtual_network_rule(K::ENGINE, rg, server, &external_name(cr))
                .await,
        )?;
        Ok(())
    }
}
