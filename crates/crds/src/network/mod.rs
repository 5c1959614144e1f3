//! Microsoft.Network CRDs (virtual networks and subnets)

pub mod virtual_network;
pub mod subnet;

pub use virtual_network::*;
pub use subnet::*;
