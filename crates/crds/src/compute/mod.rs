//! Microsoft.ContainerService CRDs

pub mod aks_cluster;

pub use aks_cluster::*;
