//! Managed resource contract shared by every Azure CRD
//!
//! Each managed kind carries the same envelope around its Azure-specific
//! parameters: a ProviderConfig reference, a deletion policy and an optional
//! connection secret target in the spec; conditions and an `atProvider`
//! observation in the status. The [`Managed`] trait exposes that envelope so
//! the controller can drive every kind through one reconcile loop.

use crate::conditions::{self, Condition};
use crate::references::SecretReference;
use kube::Resource;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Annotation holding the Azure name of the external resource
pub const EXTERNAL_NAME_ANNOTATION: &str = "azure.microscaler.io/external-name";

/// Finalizer added to every managed resource
pub const MANAGED_FINALIZER: &str = "azure.microscaler.io/managed-resource";

/// ProviderConfig used when a resource does not name one
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

/// What happens to the external resource when the managed resource is deleted
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Delete the Azure resource
    #[default]
    Delete,
    /// Leave the Azure resource in place
    Orphan,
}

/// Common accessors for managed resources
pub trait Managed:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Kind-specific `status.atProvider` type
    type Observation: Serialize + DeserializeOwned + Debug + Clone + PartialEq + Send + Sync + 'static;

    /// Name of the ProviderConfig supplying credentials
    fn provider_config_name(&self) -> &str;

    /// Deletion policy from the spec
    fn deletion_policy(&self) -> DeletionPolicy;

    /// Target secret for connection details
    fn connection_secret_ref(&self) -> Option<&SecretReference>;

    /// Current status conditions
    fn conditions(&self) -> &[Condition];

    /// Last recorded observation
    fn at_provider(&self) -> Option<&Self::Observation>;

    /// External name annotation, if set
    fn external_name(&self) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()?
            .get(EXTERNAL_NAME_ANNOTATION)
            .map(String::as_str)
    }

    /// Whether the resource reports `Ready=True`
    fn is_ready(&self) -> bool {
        conditions::is_ready(self.conditions())
    }
}

/// Implements [`Managed`] for a CRD whose spec has `provider_config_ref`,
/// `deletion_policy` and `write_connection_secret_to_ref`, and whose status has
/// `conditions` and `at_provider`.
#[macro_export]
macro_rules! impl_managed {
    ($kind:ty, $observation:ty) => {
        impl $crate::managed::Managed for $kind {
            type Observation = $observation;

            fn provider_config_name(&self) -> &str {
                self.spec
                    .provider_config_ref
                    .as_ref()
                    .map_or($crate::managed::DEFAULT_PROVIDER_CONFIG, |r| r.name.as_str())
            }

            fn deletion_policy(&self) -> $crate::managed::DeletionPolicy {
                self.spec.deletion_policy
            }

            fn connection_secret_ref(&self) -> Option<&$crate::references::SecretReference> {
                self.spec.write_connection_secret_to_ref.as_ref()
            }

            fn conditions(&self) -> &[$crate::conditions::Condition] {
                self.status.as_ref().map_or(&[], |s| s.conditions.as_slice())
            }

            fn at_provider(&self) -> Option<&$observation> {
                self.status.as_ref().and_then(|s| s.at_provider.as_ref())
            }
        }
    };
}
