//! AKSCluster Custom Resource Definition
//!
//! An AKS cluster is backed by more than the managed cluster itself: the
//! controller also owns an Azure AD application, its service principal and,
//! when the cluster joins an existing subnet, a Network Contributor role
//! assignment. Progress through those steps is recorded in `status.atProvider`
//! so a restarted controller resumes where it left off.

use crate::conditions::Condition;
use crate::managed::DeletionPolicy;
use crate::references::{ProviderConfigReference, ResourceReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default node VM size
pub const DEFAULT_NODE_VM_SIZE: &str = "Standard_B2s";

/// Default node count
pub const DEFAULT_NODE_COUNT: i32 = 1;

/// AKSClusterSpec defines the desired state of an AKS cluster
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "compute.azure.microscaler.io",
    version = "v1alpha1",
    kind = "AKSCluster",
    namespaced,
    status = "AKSClusterStatus",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.atProvider.state"}"#,
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".status.atProvider.endpoint"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AKSClusterSpec {
    /// Azure-specific parameters
    pub for_provider: AKSClusterParameters,

    /// ProviderConfig supplying credentials (defaults to "default")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    /// Whether to delete or orphan the Azure resources on deletion
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Secret to write the kubeconfig to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// Parameters of an AKS cluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AKSClusterParameters {
    /// Resource group name (resolved from `resourceGroupNameRef` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// Reference to a ResourceGroup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_ref: Option<ResourceReference>,

    /// Azure region
    pub location: String,

    /// Kubernetes version
    pub version: String,

    /// Number of nodes in the default agent pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i32>,

    /// VM size of the default agent pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_vm_size: Option<String>,

    /// DNS prefix of the API server FQDN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name_prefix: Option<String>,

    /// Disable Kubernetes RBAC
    #[serde(default)]
    pub disable_rbac: bool,

    /// ARM ID of the subnet for the agent pool (resolved from `vnetSubnetIdRef`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnet_subnet_id: Option<String>,

    /// Reference to a Subnet; resolves to its `status.atProvider.id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnet_subnet_id_ref: Option<ResourceReference>,

    /// Secret receiving the service principal `clientId` and `clientSecret`
    pub write_service_principal_secret_to: SecretReference,
}

impl AKSClusterParameters {
    /// Node count with the default applied
    pub fn node_count(&self) -> i32 {
        self.node_count.unwrap_or(DEFAULT_NODE_COUNT)
    }

    /// Node VM size with the default applied
    pub fn node_vm_size(&self) -> &str {
        self.node_vm_size.as_deref().unwrap_or(DEFAULT_NODE_VM_SIZE)
    }
}

/// Observed state of an AKS cluster and its AD objects
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AKSClusterObservation {
    /// Provisioning state of the managed cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// ARM ID of the managed cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// API server FQDN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Object ID of the AD application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_object_id: Option<String>,

    /// Application (client) ID of the AD application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    /// Object ID of the service principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_principal_id: Option<String>,

    /// Name (GUID) of the Network Contributor role assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_assignment_name: Option<String>,

    /// Opaque token of an in-flight cluster operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_operation: Option<String>,
}

/// AKSClusterStatus defines the observed state of an AKSCluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AKSClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<AKSClusterObservation>,
}

crate::impl_managed!(AKSCluster, AKSClusterObservation);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_defaults() {
        let params = AKSClusterParameters {
            location: "westeurope".to_string(),
            version: "1.30.3".to_string(),
            ..Default::default()
        };
        assert_eq!(params.node_count(), 1);
        assert_eq!(params.node_vm_size(), "Standard_B2s");

        let params = AKSClusterParameters {
            node_count: Some(3),
            node_vm_size: Some("Standard_D4s_v5".to_string()),
            ..params
        };
        assert_eq!(params.node_count(), 3);
        assert_eq!(params.node_vm_size(), "Standard_D4s_v5");
    }
}
