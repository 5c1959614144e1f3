//! Microsoft.Resources CRDs

pub mod resource_group;

pub use resource_group::*;
