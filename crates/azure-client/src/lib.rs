//! Azure REST Client
//!
//! A Rust client for the subset of Azure Resource Manager and Microsoft Graph
//! used by the Azure provider controllers: resource groups, networking, Redis,
//! storage, DNS, MySQL/PostgreSQL servers, IoT Hub routing, AKS, AD
//! applications and role assignments.
//!
//! # Example
//!
//! ```no_run
//! use azure_client::{AzureClient, AzureClientTrait, AzureEndpoints};
//! use azure_client::auth::{build_credential, CredentialSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credential = build_credential(&CredentialSource::ManagedIdentity)?;
//! let client = AzureClient::new(
//!     credential,
//!     "00000000-0000-0000-0000-000000000000".to_string(),
//!     &AzureEndpoints::default(),
//! )?;
//!
//! let group = client.get_resource_group("my-group").await?;
//! println!("{:?}", group.provisioning_state());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Long-running operations**: resumable [`PollerToken`]s
//! - **Error classification**: not-found and authentication errors are distinguished
//! - **Retry**: [`retry::retry_with_backoff`] for eventually consistent calls
//! - **Mocking**: `test-util` enables an in-memory [`MockAzureClient`]

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
pub mod ids;
pub mod lro;
pub mod metrics;
pub mod models;
pub mod retry;
#[path = "trait.rs"]
pub mod azure_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use azure_trait::AzureClientTrait;
pub use client::{AzureClient, AzureEndpoints};
pub use common::RestClient;
pub use error::AzureError;
pub use lro::{OperationStatus, PollerToken};
pub use models::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockAzureClient;
