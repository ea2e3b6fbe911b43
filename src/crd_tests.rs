// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::*;
    use crate::parameters::{ClusterParameterName, ParameterCollection, RawParameter, RawValue};
    use crate::policy::{resolve, PolicyRecord, ResolvedParameters};
    use kube::CustomResourceExt;

    fn resolved(params: Vec<RawParameter>) -> ResolvedParameters {
        let collection = ParameterCollection::from_raw(params).unwrap();
        resolve(&PolicyRecord::default(), &collection).unwrap()
    }

    fn text(name: ClusterParameterName, value: &str) -> RawParameter {
        RawParameter::new(name, RawValue::Text(value.to_string()))
    }

    #[test]
    fn test_crd_metadata() {
        let crd = Beiboot::crd();
        assert_eq!(crd.spec.group, "getdeck.dev");
        assert_eq!(crd.spec.names.kind, "Beiboot");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.versions[0].name, "v1");
    }

    #[test]
    fn test_parameters_from_defaults() {
        let params = BeibootParameters::from(&resolved(vec![]));

        assert_eq!(params.k8s_version, None);
        assert_eq!(
            params.ports,
            Some(vec!["80:80".to_string(), "443:443".to_string()])
        );
        assert_eq!(params.nodes, Some(1));
        assert_eq!(params.max_lifetime.as_deref(), Some("1h"));
        assert_eq!(params.max_session_timeout.as_deref(), Some("5m"));
        assert_eq!(params.cluster_ready_timeout, Some(180));
        assert_eq!(params.server_resources, None);
        assert_eq!(params.gefyra.as_ref().and_then(|g| g.enabled), Some(true));
    }

    #[test]
    fn test_parameters_serialize_camel_case() {
        let params = BeibootParameters::from(&resolved(vec![
            text(ClusterParameterName::K8sVersion, "1.26.0"),
            text(ClusterParameterName::ServerResourcesRequestsCpu, "0.5"),
            text(ClusterParameterName::NodeResourcesLimitsMemory, "2Gi"),
            text(ClusterParameterName::NodeStorageRequests, "10G"),
        ]));

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["k8sVersion"], "1.26.0");
        assert_eq!(json["maxLifetime"], "1h");
        assert_eq!(json["serverResources"]["requests"]["cpu"], "500m");
        assert!(json["serverResources"].get("limits").is_none());
        assert_eq!(json["nodeResources"]["limits"]["memory"], "2Gi");
        assert_eq!(json["nodeStorageRequests"], "10G");
        assert!(json.get("serverStorageRequests").is_none());
    }

    #[test]
    fn test_to_parameters_round_trips_through_validators() {
        let original = resolved(vec![
            text(ClusterParameterName::K8sVersion, "1.27.3"),
            text(ClusterParameterName::Ports, "8080:80"),
            text(ClusterParameterName::NodeResourcesRequestsCpu, "250m"),
            text(ClusterParameterName::ServerResourcesLimitsMemory, "1.5Gi"),
            text(ClusterParameterName::TunnelEndpoint, "tunnel.example.com"),
        ]);
        let stored = BeibootParameters::from(&original);

        let rebuilt = ParameterCollection::from_raw(stored.to_parameters()).unwrap();
        let again = resolve(&PolicyRecord::default(), &rebuilt).unwrap();
        assert_eq!(again, original);
    }

    #[test]
    fn test_to_parameters_omits_unset() {
        let params = BeibootParameters {
            nodes: Some(2),
            gefyra: Some(ServiceToggle {
                enabled: Some(false),
                endpoint: None,
            }),
            ..BeibootParameters::default()
        };

        let list = params.to_parameters();
        let names: Vec<_> = list.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![ClusterParameterName::NodeCount, ClusterParameterName::GefyraEnabled]
        );
        assert_eq!(list[1].value, Some(RawValue::Bool(false)));
    }

    #[test]
    fn test_unknown_state_deserializes() {
        let status: BeibootStatus =
            serde_json::from_str(r#"{"state": "HIBERNATING", "sunset": "2026-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(status.state, BeibootState::Unknown);

        let ready: BeibootStatus = serde_json::from_str(r#"{"state": "READY"}"#).unwrap();
        assert_eq!(ready.state, BeibootState::Ready);
        assert_eq!(ready.state.to_string(), "READY");
        assert!(ready.sunset.is_none());
    }
}
