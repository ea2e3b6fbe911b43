// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process-wide cache of policy and quota records.
//!
//! Records are loaded from the [`PolicyStore`] only on an explicit refresh;
//! nothing expires on its own. Each refreshed record is published by swapping
//! its `Arc`, so readers either see the old record or the new one. Refreshes
//! are serialized so two administrators refreshing the same name cannot
//! interleave a fetch with a stale publish.

use super::record::PolicyRecord;
use super::store::{PolicyStore, RecordKind};
use crate::errors::{GatewayError, PolicyError, StoreError};
use crate::metrics;
use crate::quota::GroupQuota;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type Records<T> = RwLock<HashMap<String, Arc<T>>>;

/// Cached policy and quota records, keyed by name.
pub struct PolicyCache {
    store: Arc<dyn PolicyStore>,
    default_policy: String,
    default_group: String,
    quota_defaults: GroupQuota,
    policies: Records<PolicyRecord>,
    quotas: Records<GroupQuota>,
    refresh_lock: Mutex<()>,
}

impl PolicyCache {
    /// Create an empty cache.
    ///
    /// `default_policy` and `default_group` are the names looked up when a
    /// specific name is not cached. `quota_defaults` fills keys a quota record
    /// omits, and is used outright when no quota record is cached at all.
    #[must_use]
    pub fn new(
        store: Arc<dyn PolicyStore>,
        default_policy: &str,
        default_group: &str,
        quota_defaults: GroupQuota,
    ) -> Self {
        Self {
            store,
            default_policy: default_policy.to_string(),
            default_group: default_group.to_string(),
            quota_defaults,
            policies: RwLock::new(HashMap::new()),
            quotas: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Reload one record from the store and publish it.
    ///
    /// A record that no longer exists in the store is evicted.
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`] of the fetch, or [`StoreError::Invalid`] when
    /// the record cannot be parsed. On error the previously cached record, if
    /// any, stays in place, except for `NotFound`.
    pub async fn refresh(&self, kind: RecordKind, name: &str) -> Result<(), StoreError> {
        let _guard = self.refresh_lock.lock().await;

        let was_cached = match kind {
            RecordKind::Policy => lookup(&self.policies, name).is_some(),
            RecordKind::Quota => lookup(&self.quotas, name).is_some(),
        };
        let result = self.load(kind, name).await;
        let (status, in_store) = match &result {
            Ok(()) => ("success", true),
            Err(StoreError::NotFound { .. }) => ("not_found", false),
            Err(StoreError::Timeout { .. }) => ("timeout", false),
            Err(StoreError::Invalid { .. }) => ("invalid", true),
            Err(StoreError::Api { .. }) => ("error", false),
        };
        // Names come from callers; only known records get their own series.
        let label = if in_store || was_cached {
            name
        } else {
            metrics::UNTRACKED_RECORD_NAME
        };
        metrics::record_policy_refresh(kind, label, status);

        if let Err(StoreError::NotFound { .. }) = &result {
            let evicted = match kind {
                RecordKind::Policy => evict(&self.policies, name),
                RecordKind::Quota => evict(&self.quotas, name),
            };
            if evicted {
                info!("Evicted {} record '{}' no longer in the store", kind, name);
            }
        }

        self.publish_sizes();
        result
    }

    /// Refresh the policy and quota record of every name, logging failures.
    ///
    /// Returns how many records were loaded.
    pub async fn refresh_all<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut loaded = 0;
        for name in names {
            for kind in [RecordKind::Policy, RecordKind::Quota] {
                match self.refresh(kind, name.as_ref()).await {
                    Ok(()) => loaded += 1,
                    Err(e) => warn!("Skipping {} record '{}': {}", kind, name.as_ref(), e),
                }
            }
        }
        loaded
    }

    /// Cached policy for `name`, falling back to the default policy.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PolicyNotFound`] if neither is cached.
    pub fn policy(&self, name: &str) -> Result<Arc<PolicyRecord>, GatewayError> {
        if let Some(record) = lookup(&self.policies, name) {
            return Ok(record);
        }
        debug!(
            "Policy '{}' not cached, falling back to '{}'",
            name, self.default_policy
        );
        lookup(&self.policies, &self.default_policy).ok_or_else(|| GatewayError::PolicyNotFound {
            name: name.to_string(),
        })
    }

    /// Cached quota for `group`, falling back to the default group's quota and
    /// then to the configured defaults.
    #[must_use]
    pub fn quota(&self, group: &str) -> Arc<GroupQuota> {
        lookup(&self.quotas, group)
            .or_else(|| lookup(&self.quotas, &self.default_group))
            .unwrap_or_else(|| Arc::new(self.quota_defaults))
    }

    /// Whether a policy record is cached under exactly `name`.
    #[must_use]
    pub fn contains_policy(&self, name: &str) -> bool {
        lookup(&self.policies, name).is_some()
    }

    async fn load(&self, kind: RecordKind, name: &str) -> Result<(), StoreError> {
        let data = self.store.fetch(kind, name).await?;
        let invalid = |source: PolicyError| StoreError::Invalid {
            name: name.to_string(),
            source,
        };

        match kind {
            RecordKind::Policy => {
                let record = PolicyRecord::from_data(&data).map_err(invalid)?;
                publish(&self.policies, name, record);
            }
            RecordKind::Quota => {
                let quota = GroupQuota::from_data(&data, self.quota_defaults).map_err(invalid)?;
                publish(&self.quotas, name, quota);
            }
        }

        info!("Refreshed {} record '{}'", kind, name);
        Ok(())
    }

    fn publish_sizes(&self) {
        metrics::set_policy_cache_entries(RecordKind::Policy, len(&self.policies));
        metrics::set_policy_cache_entries(RecordKind::Quota, len(&self.quotas));
    }
}

fn len<T>(records: &Records<T>) -> usize {
    records.read().unwrap_or_else(PoisonError::into_inner).len()
}

fn lookup<T>(records: &Records<T>, name: &str) -> Option<Arc<T>> {
    records
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}

fn publish<T>(records: &Records<T>, name: &str, record: T) {
    records
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.to_string(), Arc::new(record));
}

fn evict<T>(records: &Records<T>, name: &str) -> bool {
    records
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name)
        .is_some()
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
