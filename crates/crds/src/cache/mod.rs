//! Microsoft.Cache CRDs

pub mod redis;

pub use redis::*;
