//! Azure Database for MySQL / PostgreSQL CRDs
//!
//! Both engines share parameter and observation types; only the CRD kinds
//! (and the ARM provider namespace the controller targets) differ.

pub mod firewall_rule;
pub mod sql_server;
pub mod virtual_network_rule;

pub use firewall_rule::*;
pub use sql_server::*;
pub use virtual_network_rule::*;
