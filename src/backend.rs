// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The orchestration backend that provisions clusters.
//!
//! The gateway never provisions anything itself. It hands a resolved
//! parameter set to a [`ClusterBackend`], which for production is
//! [`KubeClusterBackend`]: one [`Beiboot`] object per cluster, picked up by
//! the Beiboot operator.

use crate::constants::BEIBOOT_PROVIDER;
use crate::crd::{Beiboot, BeibootParameters, BeibootSpec, BeibootState};
use crate::errors::BackendError;
use crate::labels::{Labels, K8S_MANAGED_BY, MANAGED_BY_GATEWAY};
use crate::metrics;
use crate::policy::ResolvedParameters;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{client::Client, Api, ResourceExt};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Page size used when listing Beiboot objects
const LIST_PAGE_SIZE: u32 = 100;

/// One cluster as the backend reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRecord {
    /// Cluster id (the object name)
    pub id: String,
    pub namespace: String,
    pub labels: Labels,
    pub state: BeibootState,
    /// When the backend will tear the cluster down
    pub sunset: Option<DateTime<Utc>>,
    pub parameters: BeibootParameters,
}

impl From<&Beiboot> for ClusterRecord {
    fn from(beiboot: &Beiboot) -> Self {
        let status = beiboot.status.clone().unwrap_or_default();
        let sunset = status.sunset.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(t) => Some(t.with_timezone(&Utc)),
                Err(e) => {
                    warn!(
                        "Ignoring unparsable sunset '{}' on Beiboot {}: {}",
                        raw,
                        beiboot.name_any(),
                        e
                    );
                    None
                }
            }
        });

        Self {
            id: beiboot.name_any(),
            namespace: beiboot.namespace().unwrap_or_default(),
            labels: Labels::from_map(beiboot.labels()),
            state: status.state,
            sunset,
            parameters: beiboot.spec.parameters.clone(),
        }
    }
}

/// Cluster lifecycle operations of the orchestration backend.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Submit a new cluster under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend rejects or does not answer.
    async fn create(
        &self,
        id: &str,
        labels: &Labels,
        parameters: &ResolvedParameters,
    ) -> Result<ClusterRecord, BackendError>;

    /// All clusters whose labels match every set field of `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend fails or does not answer.
    async fn list(&self, labels: &Labels) -> Result<Vec<ClusterRecord>, BackendError>;

    /// A single cluster, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend fails or does not answer.
    async fn read(&self, id: &str) -> Result<Option<ClusterRecord>, BackendError>;

    /// Request deletion of a cluster. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend fails or does not answer.
    async fn delete(&self, id: &str) -> Result<bool, BackendError>;
}

/// [`ClusterBackend`] that manages [`Beiboot`] custom resources.
#[derive(Clone)]
pub struct KubeClusterBackend {
    client: Client,
    namespace: String,
    timeout: Duration,
}

impl KubeClusterBackend {
    #[must_use]
    pub fn new(client: Client, namespace: &str, timeout: Duration) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            timeout,
        }
    }

    fn api(&self) -> Api<Beiboot> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Run one API call under the backend timeout.
    ///
    /// A 404 answer becomes `Ok(None)`.
    async fn call<T, F>(
        &self,
        operation: &'static str,
        request: F,
    ) -> Result<Option<T>, BackendError>
    where
        T: Send,
        F: Future<Output = Result<T, kube::Error>> + Send,
    {
        let result = match tokio::time::timeout(self.timeout, request).await {
            Err(_) => {
                error!(
                    "Beiboot {} in namespace {} timed out after {:?}",
                    operation, self.namespace, self.timeout
                );
                metrics::record_backend_request(operation, "timeout");
                return Err(BackendError::Timeout {
                    operation,
                    timeout: self.timeout,
                });
            }
            Ok(result) => result,
        };

        match result {
            Ok(value) => {
                metrics::record_backend_request(operation, "success");
                Ok(Some(value))
            }
            Err(kube::Error::Api(response)) if response.code == 404 => {
                metrics::record_backend_request(operation, "not_found");
                Ok(None)
            }
            Err(e) => {
                error!(
                    "Beiboot {} in namespace {} failed: {}",
                    operation, self.namespace, e
                );
                metrics::record_backend_request(operation, "error");
                Err(BackendError::Api {
                    operation,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn build_beiboot(
        &self,
        id: &str,
        labels: &Labels,
        parameters: &ResolvedParameters,
    ) -> Beiboot {
        let mut object_labels = labels.to_map();
        object_labels.insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_GATEWAY.to_string());

        Beiboot {
            metadata: ObjectMeta {
                name: Some(id.to_string()),
                namespace: Some(self.namespace.clone()),
                labels: Some(object_labels),
                ..Default::default()
            },
            spec: BeibootSpec {
                provider: BEIBOOT_PROVIDER.to_string(),
                parameters: BeibootParameters::from(parameters),
            },
            status: None,
        }
    }
}

#[async_trait]
impl ClusterBackend for KubeClusterBackend {
    async fn create(
        &self,
        id: &str,
        labels: &Labels,
        parameters: &ResolvedParameters,
    ) -> Result<ClusterRecord, BackendError> {
        let beiboot = self.build_beiboot(id, labels, parameters);
        let api = self.api();

        let created = self
            .call("create", api.create(&PostParams::default(), &beiboot))
            .await?
            .ok_or_else(|| BackendError::Api {
                operation: "create",
                reason: format!("namespace {} not found", self.namespace),
            })?;

        debug!("Created Beiboot {}/{}", self.namespace, id);
        Ok(ClusterRecord::from(&created))
    }

    async fn list(&self, labels: &Labels) -> Result<Vec<ClusterRecord>, BackendError> {
        let api = self.api();
        let mut params = ListParams::default().labels(&labels.to_selector());
        params.limit = Some(LIST_PAGE_SIZE);

        let mut records = Vec::new();
        loop {
            let Some(page) = self.call("list", api.list(&params)).await? else {
                break;
            };
            records.extend(page.items.iter().map(ClusterRecord::from));

            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => params.continue_token = Some(token),
                _ => break,
            }
        }

        debug!(
            selector = %labels.to_selector(),
            count = records.len(),
            "Listed Beiboot objects"
        );
        Ok(records)
    }

    async fn read(&self, id: &str) -> Result<Option<ClusterRecord>, BackendError> {
        let api = self.api();
        Ok(self
            .call("read", api.get(id))
            .await?
            .map(|beiboot| ClusterRecord::from(&beiboot)))
    }

    async fn delete(&self, id: &str) -> Result<bool, BackendError> {
        let api = self.api();
        let deleted = self
            .call("delete", api.delete(id, &DeleteParams::default()))
            .await?
            .is_some();
        if deleted {
            debug!("Requested deletion of Beiboot {}/{}", self.namespace, id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod backend_tests;
