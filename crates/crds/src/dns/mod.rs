//! Microsoft.Network DNS CRDs

pub mod zone;

pub use zone::*;
