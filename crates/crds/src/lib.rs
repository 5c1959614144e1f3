//! Azure Provider CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for Azure managed resources, plus the
//! shared managed-resource envelope (conditions, references, deletion policy).

pub mod conditions;
pub mod error;
pub mod managed;
pub mod provider_config;
pub mod references;

pub mod cache;
pub mod compute;
pub mod database;
pub mod devices;
pub mod dns;
pub mod network;
pub mod resources;
pub mod storage;

pub use conditions::*;
pub use error::CrdError;
pub use managed::*;
pub use provider_config::*;
pub use references::*;

pub use cache::*;
pub use compute::*;
pub use database::*;
pub use devices::*;
pub use dns::*;
pub use network::*;
pub use resources::*;
pub use storage::*;
