//! Microsoft.Devices CRDs

pub mod iothub_endpoint;

pub use iothub_endpoint::*;
