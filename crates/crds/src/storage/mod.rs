//! Microsoft.Storage CRDs

pub mod account;

pub use account::*;
