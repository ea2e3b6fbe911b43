// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access to the administrative policy store.
//!
//! Policy and quota records live in `ConfigMap`s named `<prefix><name>`. The
//! store only returns raw key/value data; turning it into a [`PolicyRecord`]
//! or [`GroupQuota`] is left to [`super::PolicyCache`].
//!
//! [`PolicyRecord`]: super::PolicyRecord
//! [`GroupQuota`]: crate::quota::GroupQuota

use crate::errors::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{client::Client, Api};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// The two kinds of record the store holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Parameter bounds (`api-config-<name>`)
    Policy,
    /// Live cluster limits (`api-group-<name>`)
    Quota,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Policy => f.write_str("policy"),
            RecordKind::Quota => f.write_str("quota"),
        }
    }
}

/// Read-only key/value record source.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fetch the raw data of record `name`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the record does not exist
    /// - [`StoreError::Timeout`] if the store does not answer in time
    /// - [`StoreError::Api`] for any other store failure
    async fn fetch(
        &self,
        kind: RecordKind,
        name: &str,
    ) -> Result<BTreeMap<String, String>, StoreError>;
}

/// Where records of one kind are stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLocation {
    pub prefix: String,
    pub namespace: String,
}

impl RecordLocation {
    #[must_use]
    pub fn object_name(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }
}

/// [`PolicyStore`] backed by Kubernetes `ConfigMap`s.
#[derive(Clone)]
pub struct KubePolicyStore {
    client: Client,
    policies: RecordLocation,
    quotas: RecordLocation,
    timeout: Duration,
}

impl KubePolicyStore {
    #[must_use]
    pub fn new(
        client: Client,
        policies: RecordLocation,
        quotas: RecordLocation,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            policies,
            quotas,
            timeout,
        }
    }

    fn location(&self, kind: RecordKind) -> &RecordLocation {
        match kind {
            RecordKind::Policy => &self.policies,
            RecordKind::Quota => &self.quotas,
        }
    }
}

#[async_trait]
impl PolicyStore for KubePolicyStore {
    async fn fetch(
        &self,
        kind: RecordKind,
        name: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let location = self.location(kind);
        let object_name = location.object_name(name);
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &location.namespace);

        debug!(
            "Fetching {} record {}/{}",
            kind, location.namespace, object_name
        );

        match tokio::time::timeout(self.timeout, api.get(&object_name)).await {
            Err(_) => {
                error!(
                    "Timed out after {:?} reading ConfigMap {}/{}",
                    self.timeout, location.namespace, object_name
                );
                Err(StoreError::Timeout {
                    name: object_name,
                    timeout: self.timeout,
                })
            }
            Ok(Err(kube::Error::Api(response))) if response.code == 404 => {
                Err(StoreError::NotFound {
                    name: object_name,
                    namespace: location.namespace.clone(),
                })
            }
            Ok(Err(e)) => {
                error!(
                    "Failed to read ConfigMap {}/{}: {}",
                    location.namespace, object_name, e
                );
                Err(StoreError::Api {
                    name: object_name,
                    reason: e.to_string(),
                })
            }
            Ok(Ok(config_map)) => Ok(config_map.data.unwrap_or_default()),
        }
    }
}
