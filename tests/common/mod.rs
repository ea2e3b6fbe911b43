// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use beiboot_gateway::backend::{ClusterBackend, ClusterRecord};
use beiboot_gateway::crd::{BeibootParameters, BeibootState};
use beiboot_gateway::errors::{BackendError, StoreError};
use beiboot_gateway::gateway::{ClusterGateway, GatewayConfig};
use beiboot_gateway::labels::Labels;
use beiboot_gateway::policy::{PolicyCache, PolicyStore, RecordKind, ResolvedParameters};
use beiboot_gateway::quota::GroupQuota;
use kube::client::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Policy store backed by a map that tests can change between refreshes.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<(RecordKind, String), BTreeMap<String, String>>>,
}

impl InMemoryStore {
    pub fn put(&self, kind: RecordKind, name: &str, pairs: &[(&str, &str)]) {
        let data = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.records
            .lock()
            .unwrap()
            .insert((kind, name.to_string()), data);
    }

    pub fn remove(&self, kind: RecordKind, name: &str) {
        self.records
            .lock()
            .unwrap()
            .remove(&(kind, name.to_string()));
    }
}

#[async_trait]
impl PolicyStore for InMemoryStore {
    async fn fetch(
        &self,
        kind: RecordKind,
        name: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        self.records
            .lock()
            .unwrap()
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
                namespace: "getdeck".to_string(),
            })
    }
}

/// Orchestration backend that keeps clusters in memory.
#[derive(Default)]
pub struct InMemoryBackend {
    clusters: Mutex<Vec<ClusterRecord>>,
}

impl InMemoryBackend {
    /// Add a live cluster without going through admission.
    pub fn seed(&self, id: &str, user: &str, group: &str) {
        self.clusters.lock().unwrap().push(ClusterRecord {
            id: id.to_string(),
            namespace: "getdeck".to_string(),
            labels: Labels {
                name: Some(id.to_string()),
                user: Some(user.to_string()),
                group: Some(group.to_string()),
            },
            state: BeibootState::Running,
            sunset: None,
            parameters: BeibootParameters::default(),
        });
    }

    pub fn count(&self) -> usize {
        self.clusters.lock().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<ClusterRecord> {
        self.clusters
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

#[async_trait]
impl ClusterBackend for InMemoryBackend {
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
        Ok(self.get(id))
    }

    async fn delete(&self, id: &str) -> Result<bool, BackendError> {
        let mut clusters = self.clusters.lock().unwrap();
        let before = clusters.len();
        clusters.retain(|c| c.id != id);
        Ok(clusters.len() != before)
    }
}

/// Gateway configuration with known groups `developer`, `free` and the
/// `default` group.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        default_policy: "default".to_string(),
        default_group: "default".to_string(),
        known_groups: vec!["developer".to_string(), "free".to_string()],
        group_role_prefix: "api-group-".to_string(),
        quota_defaults: GroupQuota::default(),
    }
}

/// A gateway wired to in-memory collaborators, with every record of the
/// store for `default`, `developer` and `free` already loaded.
pub struct TestGateway {
    pub store: Arc<InMemoryStore>,
    pub backend: Arc<InMemoryBackend>,
    pub cache: Arc<PolicyCache>,
    pub gateway: ClusterGateway,
}

impl TestGateway {
    pub async fn new(store: InMemoryStore) -> Self {
        let config = test_config();
        let store = Arc::new(store);
        let backend = Arc::new(InMemoryBackend::default());
        let cache = Arc::new(PolicyCache::new(
            store.clone(),
            &config.default_policy,
            &config.default_group,
            config.quota_defaults,
        ));
        cache.refresh_all(["default", "developer", "free"]).await;
        let gateway = ClusterGateway::new(&config, cache.clone(), backend.clone());

        Self {
            store,
            backend,
            cache,
            gateway,
        }
    }
}

/// A store holding an empty `default` policy.
pub fn default_store() -> InMemoryStore {
    let store = InMemoryStore::default();
    store.put(RecordKind::Policy, "default", &[]);
    store
}
