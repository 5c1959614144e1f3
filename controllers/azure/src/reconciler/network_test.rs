//! Unit tests for VirtualNetwork and Subnet external clients

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::managed::ManagedKind;
    use crate::reconciler::network::{subnet_up_to_date, vnet_up_to_date};
    use crate::test_utils::TestContext;
    use azure_client::{AzureClientTrait, ids, models};
    use crds::*;

    fn vnet_params() -> VirtualNetworkParameters {
        VirtualNetworkParameters {
            resource_group_name: Some("rg".to_string()),
            location: "westeurope".to_string(),
            address_space: AddressSpace {
                address_prefixes: vec!["10.0.0.0/16".to_string()],
            },
            ..Default::default()
        }
    }

    fn vnet(name: &str) -> VirtualNetwork {
        VirtualNetwork::new(
            name,
            VirtualNetworkSpec {
                for_provider: vnet_params(),
                ..Default::default()
            },
        )
    }

    fn subnet(name: &str) -> Subnet {
        Subnet::new(
            name,
            SubnetSpec {
                for_provider: SubnetParameters {
                    resource_group_name: Some("rg".to_string()),
                    virtual_network_name: Some("vnet".to_string()),
                    address_prefix: "10.0.1.0/24".to_string(),
                    service_endpoints: vec![ServiceEndpoint {
                        service: "Microsoft.Sql".to_string(),
                    }],
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_vnet_up_to_date() {
        let p = vnet_params();
        let mut observed = models::VirtualNetwork {
            location: "westeurope".to_string(),
            properties: models::VirtualNetworkProperties {
                address_space: Some(models::AddressSpace {
                    address_prefixes: vec!["10.0.0.0/16".to_string()],
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(vnet_up_to_date(&p, &observed));

        observed.properties.enable_ddos_protection = Some(true);
        assert!(!vnet_up_to_date(&p, &observed));
    }

    #[test]
    fn test_subnet_endpoints_compare_as_set() {
        let mut p = subnet("sn").spec.for_provider;
        p.service_endpoints.push(ServiceEndpoint {
            service: "Microsoft.Storage".to_string(),
        });
        let observed = models::Subnet {
            properties: models::SubnetProperties {
                address_prefix: Some("10.0.1.0/24".to_string()),
                service_endpoints: vec![
                    models::ServiceEndpoint {
                        service: "Microsoft.Storage".to_string(),
                        ..Default::default()
                    },
                    models::ServiceEndpoint {
                        service: "Microsoft.Sql".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(subnet_up_to_date(&p, &observed));
    }

    #[tokio::test]
    async fn test_vnet_lifecycle() {
        let test = TestContext::<VirtualNetworkObservation>::new();
        let client = VirtualNetwork::external(test.context());
        let cr = vnet("vnet");

        assert!(!client.observe(&cr).await.unwrap().resource_exists);
        client.create(&cr).await.unwrap();

        let observation = client.observe(&cr).await.unwrap();
        assert!(observation.resource_exists);
        assert!(observation.resource_up_to_date);
        let at_provider = observation.at_provider.unwrap();
        assert_eq!(at_provider.r#type.as_deref(), Some("Microsoft.Network/virtualNetworks"));
        assert!(at_provider.resource_guid.is_some());

        client.delete(&cr).await.unwrap();
        assert!(!client.observe(&cr).await.unwrap().resource_exists);
    }

    #[tokio::test]
    async fn test_vnet_update_keeps_attached_subnets() {
        let test = TestContext::<VirtualNetworkObservation>::new();
        let client = VirtualNetwork::external(test.context());
        let mut cr = vnet("vnet");
        client.create(&cr).await.unwrap();

        let subnets = TestContext::<SubnetObservation>::with_azure(test.azure.clone());
        Subnet::external(subnets.context()).create(&subnet("sn")).await.unwrap();
        let sub = test.azure.subscription_id().to_string();
        let subnet_id = ids::subnet(&sub, "rg", "vnet", "sn");
        assert!(test.azure.contains(&subnet_id));

        cr.spec.for_provider.tags.insert("env".to_string(), "prod".to_string());
        assert!(!client.observe(&cr).await.unwrap().resource_up_to_date);
        client.update(&cr).await.unwrap();

        assert!(test.azure.contains(&subnet_id));
        assert!(client.observe(&cr).await.unwrap().resource_up_to_date);
        let current = test.azure.get_virtual_network("rg", "vnet").await.unwrap();
        let names: Vec<_> = current
            .properties
            .subnets
            .unwrap_or_default()
            .iter()
            .filter_map(|s| s.get("name").and_then(|n| n.as_str()).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["sn".to_string()]);
    }

    #[tokio::test]
    async fn test_vnet_put_without_subnets_drops_them() {
        let test = TestContext::<VirtualNetworkObservation>::new();
        let client = VirtualNetwork::external(test.context());
        client.create(&vnet("vnet")).await.unwrap();
        let subnets = TestContext::<SubnetObservation>::with_azure(test.azure.clone());
        Subnet::external(subnets.context()).create(&subnet("sn")).await.unwrap();

        // A second create sends no subnet list, like a blind PUT
        client.create(&vnet("vnet")).await.unwrap();
        let sub = test.azure.subscription_id().to_string();
        assert!(!test.azure.contains(&ids::subnet(&sub, "rg", "vnet", "sn")));
    }

    #[tokio::test]
    async fn test_vnet_without_resource_group_is_unresolved() {
        let test = TestContext::<VirtualNetworkObservation>::new();
        let client = VirtualNetwork::external(test.context());
        let mut cr = vnet("vnet");
        cr.spec.for_provider.resource_group_name = None;

        let err = client.observe(&cr).await.unwrap_err();
        assert!(matches!(err, ControllerError::Unresolved(ref f) if f == "resourceGroupName"));
        assert!(test.azure.calls().is_empty());
    }

    #[tokio::test]
    async fn test_subnet_requires_parent_vnet() {
        let test = TestContext::<SubnetObservation>::new();
        let client = Subnet::external(test.context());
        let cr = subnet("sn");

        let err = client.create(&cr).await.unwrap_err();
        assert!(err.is_not_found());

        let sub = test.azure.subscription_id().to_string();
        test.azure.insert(
            &ids::virtual_network(&sub, "rg", "vnet"),
            &models::VirtualNetwork {
                location: "westeurope".to_string(),
                ..Default::default()
            },
        );
        client.create(&cr).await.unwrap();

        let observation = client.observe(&cr).await.unwrap();
        assert!(observation.resource_up_to_date);
        assert_eq!(
            observation.at_provider.unwrap().id.as_deref(),
            Some(ids::subnet(&sub, "rg", "vnet", "sn").as_str())
        );
    }
}
