// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the cluster gateway

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{BeibootParameters, BeibootState};
    use crate::errors::ErrorKind;
    use crate::parameters::{ClusterParameterName, RawValue};
    use crate::policy::{PolicyStore, ResolvedParameters};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    type Data = BTreeMap<String, String>;

    #[derive(Default)]
    struct MapStore {
        policies: BTreeMap<String, Data>,
        quotas: BTreeMap<String, Data>,
    }

    #[async_trait]
    impl PolicyStore for MapStore {
        async fn fetch(&self, kind: RecordKind, name: &str) -> Result<Data, StoreError> {
            let records = match kind {
                RecordKind::Policy => &self.policies,
                RecordKind::Quota => &self.quotas,
            };
            records.get(name).cloned().ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
                namespace: "getdeck".to_string(),
            })
        }
    }

    /// Backend that keeps clusters in memory. `colliding` makes every id look taken.
    #[derive(Default)]
    struct MemoryBackend {
        clusters: Mutex<Vec<ClusterRecord>>,
        colliding: bool,
    }

    #[async_trait]
    impl ClusterBackend for MemoryBackend {
        async fn create(
            &self,
            id: &str,
            labels: &Labels,
            parameters: &ResolvedParameters,
        ) -> Result<ClusterRecord, BackendError> {
            let record = ClusterRecord {
                id: id.to_string(),
                namespace: "getdeck".to_string(),
                labels: labels.clone(),
                state: BeibootState::Requested,
                sunset: None,
                parameters: BeibootParameters::from(parameters),
            };
            self.clusters.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn list(&self, labels: &Labels) -> Result<Vec<ClusterRecord>, BackendError> {
            Ok(self
                .clusters
                .lock()
                .unwrap()
                .iter()
                .filter(|c| labels.matches(&c.labels))
                .cloned()
                .collect())
        }

        async fn read(&self, id: &str) -> Result<Option<ClusterRecord>, BackendError> {
            if self.colliding {
                return Ok(Some(ClusterRecord {
                    id: id.to_string(),
                    namespace: "getdeck".to_string(),
                    labels: Labels::default(),
                    state: BeibootState::Running,
                    sunset: None,
                    parameters: BeibootParameters::default(),
                }));
            }
            Ok(self
                .clusters
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned())
        }

        async fn delete(&self, id: &str) -> Result<bool, BackendError> {
            let mut clusters = self.clusters.lock().unwrap();
            let before = clusters.len();
            clusters.retain(|c| c.id != id);
            Ok(clusters.len() != before)
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig {
            default_policy: "default".to_string(),
            default_group: "default".to_string(),
            known_groups: vec!["developer".to_string(), "free".to_string()],
            group_role_prefix: "api-group-".to_string(),
            quota_defaults: GroupQuota::default(),
        }
    }

    async fn gateway_with(store: MapStore, backend: Arc<MemoryBackend>) -> ClusterGateway {
        let config = config();
        let cache = Arc::new(PolicyCache::new(
            Arc::new(store),
            &config.default_policy,
            &config.default_group,
            config.quota_defaults,
        ));
        cache.refresh_all(["default", "developer", "free"]).await;
        ClusterGateway::new(&config, cache, backend)
    }

    fn default_store() -> MapStore {
        let mut store = MapStore::default();
        store.policies.insert("default".to_string(), Data::new());
        store
    }

    fn request(name: &str) -> ClusterRequest {
        ClusterRequest {
            name: name.to_string(),
            ..ClusterRequest::default()
        }
    }

    #[tokio::test]
    async fn test_create_labels_cluster_with_selected_group() {
        let backend = Arc::new(MemoryBackend::default());
        let gateway = gateway_with(default_store(), backend.clone()).await;
        let caller = gateway
            .caller("alice", Some("api-group-free, api-group-developer"))
            .unwrap();

        let record = gateway.create_cluster(&caller, request("demo")).await.unwrap();
        assert_eq!(record.labels.name.as_deref(), Some("demo"));
        assert_eq!(record.labels.user.as_deref(), Some("alice"));
        assert_eq!(record.labels.group.as_deref(), Some("developer"));
        assert!(Uuid::parse_str(&record.id).is_ok(), "Cluster id should be a UUID");
        assert_eq!(backend.clusters.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unavailable_group() {
        let gateway = gateway_with(default_store(), Arc::new(MemoryBackend::default())).await;
        let caller = Caller::new("alice", ["free"]);

        let err = gateway
            .create_cluster(
                &caller,
                ClusterRequest {
                    group: Some("developer".to_string()),
                    ..request("demo")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGroup);
        assert_eq!(
            err.to_string(),
            "Invalid group: developer. Available groups: free, default."
        );
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_label() {
        let gateway = gateway_with(default_store(), Arc::new(MemoryBackend::default())).await;
        let err = gateway
            .create_cluster(&Caller::new("alice", Vec::<String>::new()), request("not a label"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_create_without_any_policy_fails() {
        let gateway = gateway_with(MapStore::default(), Arc::new(MemoryBackend::default())).await;
        let err = gateway
            .create_cluster(&Caller::default(), request("demo"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
    }

    #[tokio::test]
    async fn test_format_errors_precede_bounds_checks() {
        let gateway = gateway_with(default_store(), Arc::new(MemoryBackend::default())).await;
        let req = ClusterRequest {
            parameters: vec![
                RawParameter::new(ClusterParameterName::NodeCount, RawValue::Integer(9)),
                RawParameter::new(
                    ClusterParameterName::Lifetime,
                    RawValue::Text("forever".to_string()),
                ),
            ],
            ..request("demo")
        };

        let err = gateway
            .create_cluster(&Caller::new("alice", ["free"]), req)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        match err {
            GatewayError::Validation(e) => {
                assert_eq!(e.parameter(), ClusterParameterName::Lifetime);
            }
            other => panic!("Expected a validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_id_collision_is_an_error() {
        let backend = Arc::new(MemoryBackend {
            colliding: true,
            ..MemoryBackend::default()
        });
        let gateway = gateway_with(default_store(), backend.clone()).await;

        let err = gateway
            .create_cluster(&Caller::new("alice", ["free"]), request("demo"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Backend(BackendError::IdCollision { .. })
        ));
        assert!(backend.clusters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_info_and_delete_are_scoped_to_user() {
        let gateway = gateway_with(default_store(), Arc::new(MemoryBackend::default())).await;
        let alice = Caller::new("alice", Vec::<String>::new());
        let bob = Caller::new("bob", Vec::<String>::new());

        let record = gateway.create_cluster(&alice, request("demo")).await.unwrap();

        let err = gateway.cluster_info(&bob, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = gateway.delete_cluster(&bob, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(gateway.list_clusters(&bob).await.unwrap().is_empty());

        let info = gateway.cluster_info(&alice, &record.id).await.unwrap();
        assert_eq!(info.id, record.id);
        assert_eq!(gateway.list_clusters(&alice).await.unwrap().len(), 1);

        gateway.delete_cluster(&alice, &record.id).await.unwrap();
        let err = gateway.delete_cluster(&alice, &record.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_user_must_be_a_valid_label_value() {
        let backend = Arc::new(MemoryBackend::default());
        let gateway = gateway_with(default_store(), backend.clone()).await;

        for user in ["alice,group=free", "bob=eve", "carol dan"] {
            let err = gateway.caller(user, None).unwrap_err();
            assert!(
                matches!(err, GatewayError::InvalidLabel { .. }),
                "'{user}' should be rejected, got {err:?}"
            );
        }

        // Callers built directly are checked before any selector is issued.
        let smuggled = Caller::new("alice,group=free", Vec::<String>::new());
        let err = gateway.list_clusters(&smuggled).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        let err = gateway.cluster_info(&smuggled, "any").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert!(backend.clusters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_selected_policy_falls_back_to_default() {
        let mut store = default_store();
        store.policies.insert(
            "developer".to_string(),
            [("NODE_COUNT_MAX".to_string(), "4".to_string())].into(),
        );
        let gateway = gateway_with(store, Arc::new(MemoryBackend::default())).await;

        let developer = gateway
            .selected_policy(&Caller::new("alice", ["developer"]))
            .unwrap();
        assert_eq!(developer.node_count_max, Some(4));

        let free = gateway.selected_policy(&Caller::new("bob", ["free"])).unwrap();
        assert_eq!(free.node_count_max, Some(3));
    }

    #[tokio::test]
    async fn test_refresh_policy_accepts_either_record_kind() {
        let mut store = default_store();
        store.quotas.insert("free".to_string(), Data::new());
        let gateway = gateway_with(store, Arc::new(MemoryBackend::default())).await;

        assert!(gateway.refresh_policy("default").await.is_ok());
        assert!(gateway.refresh_policy("free").await.is_ok());

        let err = gateway.refresh_policy("unknown").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
    }

    #[test]
    fn test_cluster_request_deserializes() {
        let req: ClusterRequest = serde_json::from_str(
            r#"{"name": "demo", "parameters": [{"name": "NODE_COUNT", "value": 2}]}"#,
        )
        .unwrap();
        assert_eq!(req.name, "demo");
        assert_eq!(req.group, None);
        assert_eq!(
            req.parameters,
            vec![RawParameter::new(
                ClusterParameterName::NodeCount,
                RawValue::Integer(2)
            )]
        );
    }
}
