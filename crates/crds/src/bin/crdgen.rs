//! CRD Generator
//!
//! Prints every Azure provider CRD as a multi-document YAML stream.
//!
//! ```bash
//! cargo run -p crds --bin crdgen > config/crd/all.yaml
//! ```

use crds::*;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::CustomResourceExt;

fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        ProviderConfig::crd(),
        ResourceGroup::crd(),
        VirtualNetwork::crd(),
        Subnet::crd(),
        Redis::crd(),
        Account::crd(),
        DnsZone::crd(),
        MySQLServer::crd(),
        PostgreSQLServer::crd(),
        MySQLServerFirewallRule::crd(),
        PostgreSQLServerFirewallRule::crd(),
        MySQLServerVirtualNetworkRule::crd(),
        PostgreSQLServerVirtualNetworkRule::crd(),
        IotHubEndpoint::crd(),
        AKSCluster::crd(),
    ]
}

fn main() {
    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    for crd in all_crds() {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
