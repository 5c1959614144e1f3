//! Azure REST models
//!
//! Wire types for the ARM resource providers and Microsoft Graph objects the
//! controllers manage. Only the fields the controllers read or write are
//! modelled; unknown fields are ignored on read.

pub mod authorization;
pub mod cache;
pub mod compute;
pub mod database;
pub mod devices;
pub mod dns;
pub mod graph;
pub mod network;
pub mod resources;
pub mod storage;

pub use authorization::*;
pub use cache::*;
pub use compute::*;
pub use database::*;
pub use devices::*;
pub use dns::*;
pub use graph::*;
pub use network::*;
pub use resources::*;
pub use storage::*;

use serde::{Deserialize, Serialize};

/// Error envelope returned by ARM and Graph
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// Error detail inside an [`ErrorResponse`]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// ARM list response (`{"value": [...], "nextLink": ...}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}
