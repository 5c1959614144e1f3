//! Cross-resource reference resolution
//!
//! A `fooRef` names another managed resource in the same namespace. It
//! resolves to that resource's external name (or, for subnet IDs, to the ARM
//! ID it observed) once the resource reports `Ready=True`. Resolved values are
//! returned as `forProvider` fields for the caller to persist in the spec.

use crate::error::ControllerError;
use crds::{Managed, ResourceReference, Subnet};
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

/// Resolved `forProvider` fields, by camelCase field name
pub type Resolved = BTreeMap<&'static str, String>;

/// Looks up referenced resources in one namespace
#[derive(Clone)]
pub struct Resolver {
    client: Client,
    namespace: String,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }

    async fn fetch<R>(&self, reference: &ResourceReference) -> Result<R, ControllerError>
    where
        R: Managed + Resource<Scope = NamespaceResourceScope>,
    {
        let api: Api<R> = Api::namespaced(self.client.clone(), &self.namespace);
        match api.get_opt(&reference.name).await? {
            Some(resource) => Ok(resource),
            None => Err(ControllerError::ReferenceNotReady {
                kind: R::kind(&()).to_string(),
                name: reference.name.clone(),
            }),
        }
    }

    /// Resolve `reference` into `field` unless a value is already set
    pub async fn name<R>(
        &self,
        resolved: &mut Resolved,
        field: &'static str,
        current: Option<&str>,
        reference: Option<&ResourceReference>,
    ) -> Result<(), ControllerError>
    where
        R: Managed + Resource<Scope = NamespaceResourceScope>,
    {
        let Some(reference) = pending(current, reference) else {
            return Ok(());
        };
        let referenced: R = self.fetch(reference).await?;
        let value = referenced_name(&referenced)?;
        debug!("Resolved {} from {} {}: {}", field, R::kind(&()), reference.name, value);
        resolved.insert(field, value);
        Ok(())
    }

    /// Resolve a subnet reference into its ARM ID
    pub async fn subnet_id(
        &self,
        resolved: &mut Resolved,
        field: &'static str,
        current: Option<&str>,
        reference: Option<&ResourceReference>,
    ) -> Result<(), ControllerError> {
        let Some(reference) = pending(current, reference) else {
            return Ok(());
        };
        let subnet: Subnet = self.fetch(reference).await?;
        let value = referenced_subnet_id(&subnet)?;
        debug!("Resolved {} from Subnet {}: {}", field, reference.name, value);
        resolved.insert(field, value);
        Ok(())
    }
}

/// The reference still to resolve: set, and not overridden by an explicit value
pub fn pending<'a>(
    current: Option<&str>,
    reference: Option<&'a ResourceReference>,
) -> Option<&'a ResourceReference> {
    match current {
        Some(value) if !value.is_empty() => None,
        _ => reference,
    }
}

/// External name of a Ready resource
pub fn referenced_name<R: Managed>(referenced: &R) -> Result<String, ControllerError> {
    if !referenced.is_ready() {
        return Err(not_ready(referenced));
    }
    Ok(referenced
        .external_name()
        .map_or_else(|| referenced.name_any(), str::to_string))
}

/// Observed ARM ID of a Ready subnet
pub fn referenced_subnet_id(subnet: &Subnet) -> Result<String, ControllerError> {
    if !subnet.is_ready() {
        return Err(not_ready(subnet));
    }
    subnet
        .at_provider()
        .and_then(|o| o.id.clone())
        .ok_or_else(|| not_ready(subnet))
}

fn not_ready<R: Managed>(referenced: &R) -> ControllerError {
    ControllerError::ReferenceNotReady {
        kind: R::kind(&()).to_string(),
        name: referenced.name_any(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ready, with_external_name};
    use crds::{ResourceGroup, SubnetObservation, SubnetStatus};

    #[test]
    fn test_explicit_value_wins_over_reference() {
        let reference = ResourceReference::new("rg");
        assert!(pending(Some("explicit"), Some(&reference)).is_none());
        assert_eq!(pending(None, Some(&reference)), Some(&reference));
        assert_eq!(pending(Some(""), Some(&reference)), Some(&reference));
        assert!(pending(None, None).is_none());
    }

    #[test]
    fn test_referenced_name_requires_ready() {
        let group = ResourceGroup::new("rg", Default::default());
        let err = referenced_name(&group).unwrap_err();
        assert_eq!(err.to_string(), "referenced ResourceGroup rg not ready");

        let group = ready(group);
        assert_eq!(referenced_name(&group).unwrap(), "rg");

        let group = with_external_name(group, "rg-prod-weu");
        assert_eq!(referenced_name(&group).unwrap(), "rg-prod-weu");
    }

    #[test]
    fn test_referenced_subnet_id_needs_observed_id() {
        let subnet = ready(Subnet::new("sn", Default::default()));
        assert!(matches!(
            referenced_subnet_id(&subnet),
            Err(ControllerError::ReferenceNotReady { .. })
        ));

        let mut subnet = subnet;
        let conditions = subnet.status.take().map(|s| s.conditions).unwrap_or_default();
        subnet.status = Some(SubnetStatus {
            conditions,
            at_provider: Some(SubnetObservation {
                id: Some("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/sn".to_string()),
                ..Default::default()
            }),
        });
        assert!(referenced_subnet_id(&subnet).unwrap().ends_with("/subnets/sn"));
    }
}
