// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The cluster gateway: every caller-facing operation.
//!
//! [`ClusterGateway`] ties the engine together. A create request runs through
//! a fixed pipeline:
//!
//! 1. select the group (explicit, or highest-priority known group)
//! 2. validate the scoping labels
//! 3. validate every parameter, then resolve it against the group policy
//! 4. count live clusters for the group and the caller
//! 5. check the quota and hand the request to the [`ClusterBackend`]
//!
//! Reads and deletes are scoped by the caller's `user` label; ids outside that
//! scope are reported as not found.

use crate::backend::{ClusterBackend, ClusterRecord};
use crate::errors::{BackendError, GatewayError, StoreError};
use crate::labels::Labels;
use crate::metrics;
use crate::parameters::{ParameterCollection, RawParameter};
use crate::policy::{resolve, PolicyCache, PolicyRecord, RecordKind};
use crate::quota::{check_admission, GroupQuota, GroupSelector, LiveCounts};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Process-independent gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Policy name used when the selected group has no policy of its own
    pub default_policy: String,
    /// Group every caller belongs to
    pub default_group: String,
    /// Known groups in priority order
    pub known_groups: Vec<String>,
    /// Prefix stripped from forwarded group names
    pub group_role_prefix: String,
    /// Limits used when no quota record is cached
    pub quota_defaults: GroupQuota,
}

/// The authenticated identity behind a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Caller {
    pub user: String,
    /// Forwarded groups, role prefix already stripped
    pub groups: Vec<String>,
}

impl Caller {
    #[must_use]
    pub fn new<I, S>(user: &str, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: user.to_string(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}

/// A request to create one cluster.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ClusterRequest {
    pub name: String,
    /// Group to count the cluster against; selected automatically when absent
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
}

/// Admission, lookup and deletion of clusters.
pub struct ClusterGateway {
    cache: Arc<PolicyCache>,
    backend: Arc<dyn ClusterBackend>,
    selector: GroupSelector,
}

impl ClusterGateway {
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        cache: Arc<PolicyCache>,
        backend: Arc<dyn ClusterBackend>,
    ) -> Self {
        Self {
            cache,
            backend,
            selector: GroupSelector::new(
                config.known_groups.iter().cloned(),
                &config.default_group,
                &config.group_role_prefix,
            ),
        }
    }

    #[must_use]
    pub fn selector(&self) -> &GroupSelector {
        &self.selector
    }

    /// Build a [`Caller`] from a user name and a forwarded groups header.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidLabel`] when the user name is not a
    /// valid label value, since it scopes every selector the caller issues.
    pub fn caller(
        &self,
        user: &str,
        groups_header: Option<&str>,
    ) -> Result<Caller, GatewayError> {
        Labels::for_user(user).validate()?;
        let groups = groups_header
            .map(|header| self.selector.parse_header(header))
            .unwrap_or_default();
        Ok(Caller::new(user, groups))
    }

    /// Validate, resolve and admit a cluster request, then submit it.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidGroup`] for a group the caller may not use
    /// - [`GatewayError::InvalidLabel`] for a name or user that is not a valid label value
    /// - [`GatewayError::Validation`] for the first rejected parameter
    /// - [`GatewayError::PolicyNotFound`] when no policy is cached at all
    /// - [`GatewayError::GroupQuotaExceeded`] / [`GatewayError::UserQuotaExceeded`]
    /// - [`GatewayError::Backend`] when the backend fails, including an id collision
    pub async fn create_cluster(
        &self,
        caller: &Caller,
        request: ClusterRequest,
    ) -> Result<ClusterRecord, GatewayError> {
        let group = match self.selector.resolve(request.group.as_deref(), &caller.groups) {
            Ok(group) => group,
            Err(e) => {
                warn!(user = %caller.user, "Rejected cluster request: {}", e);
                metrics::record_admission(self.selector.default_group(), "invalid");
                return Err(e);
            }
        };

        let result = self.admit(caller, &group, request).await;
        let outcome = match &result {
            Ok(_) => "admitted",
            Err(GatewayError::GroupQuotaExceeded { .. }) => "group_quota",
            Err(GatewayError::UserQuotaExceeded { .. }) => "user_quota",
            Err(GatewayError::Validation(e)) => {
                metrics::record_validation_failure(e.parameter().as_str(), e.kind().as_str());
                "invalid"
            }
            Err(GatewayError::InvalidLabel { .. }) => "invalid",
            Err(_) => "error",
        };
        metrics::record_admission(&group, outcome);

        match &result {
            Ok(record) => info!(
                user = %caller.user,
                group = %group,
                id = %record.id,
                "Admitted cluster '{}'",
                record.labels.name.as_deref().unwrap_or_default()
            ),
            Err(e) => warn!(
                user = %caller.user,
                group = %group,
                "Rejected cluster request: {}",
                e
            ),
        }
        result
    }

    async fn admit(
        &self,
        caller: &Caller,
        group: &str,
        request: ClusterRequest,
    ) -> Result<ClusterRecord, GatewayError> {
        let labels = Labels {
            name: Some(request.name),
            user: Some(caller.user.clone()),
            group: Some(group.to_string()),
        };
        labels.validate()?;

        let started = Instant::now();
        let parameters = ParameterCollection::from_raw(request.parameters)?;
        let policy = self.cache.policy(group)?;
        let resolved = resolve(&policy, &parameters)?;
        metrics::record_resolution_duration(started.elapsed());

        let quota = self.cache.quota(group);
        let counts = self.live_counts(group, &caller.user).await?;
        debug!(
            group = %group,
            group_live = counts.group,
            user_live = counts.user,
            "Counted live clusters"
        );
        check_admission(group, &quota, counts)?;

        let id = Uuid::new_v4().to_string();
        if self.backend.read(&id).await?.is_some() {
            return Err(BackendError::IdCollision { id }.into());
        }

        Ok(self.backend.create(&id, &labels, &resolved).await?)
    }

    async fn live_counts(&self, group: &str, user: &str) -> Result<LiveCounts, GatewayError> {
        let group_scope = Labels::for_group(group);
        let user_labels = user_scope(user)?;
        let (group_clusters, user_clusters) = futures::try_join!(
            self.backend.list(&group_scope),
            self.backend.list(&user_labels)
        )?;
        Ok(LiveCounts {
            group: group_clusters.len(),
            user: user_clusters.len(),
        })
    }

    /// Every cluster the caller owns.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Backend`] if the backend fails.
    pub async fn list_clusters(&self, caller: &Caller) -> Result<Vec<ClusterRecord>, GatewayError> {
        Ok(self.backend.list(&user_scope(&caller.user)?).await?)
    }

    /// One cluster owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the cluster does not exist or
    /// belongs to someone else.
    pub async fn cluster_info(
        &self,
        caller: &Caller,
        id: &str,
    ) -> Result<ClusterRecord, GatewayError> {
        let scope = user_scope(&caller.user)?;
        match self.backend.read(id).await? {
            Some(record) if scope.matches(&record.labels) => Ok(record),
            _ => Err(GatewayError::NotFound { id: id.to_string() }),
        }
    }

    /// Delete one cluster owned by the caller, returning its last known state.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the cluster does not exist or
    /// belongs to someone else.
    pub async fn delete_cluster(
        &self,
        caller: &Caller,
        id: &str,
    ) -> Result<ClusterRecord, GatewayError> {
        let record = self.cluster_info(caller, id).await?;
        if !self.backend.delete(id).await? {
            return Err(GatewayError::NotFound { id: id.to_string() });
        }
        info!(user = %caller.user, id = %id, "Deleted cluster");
        Ok(record)
    }

    /// Groups the caller may request explicitly, in priority order.
    #[must_use]
    pub fn available_groups(&self, caller: &Caller) -> Vec<String> {
        self.selector.available(&caller.groups)
    }

    /// The policy that applies to the caller's selected group.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PolicyNotFound`] if neither the group policy
    /// nor the default policy is cached.
    pub fn selected_policy(&self, caller: &Caller) -> Result<Arc<PolicyRecord>, GatewayError> {
        self.cache.policy(&self.selector.select(&caller.groups))
    }

    /// Reload the policy and quota record stored under `name`.
    ///
    /// A name may have only one of the two records.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::PolicyNotFound`] if the store has neither record
    /// - [`GatewayError::Store`] for a timeout, store failure or malformed record
    pub async fn refresh_policy(&self, name: &str) -> Result<(), GatewayError> {
        let mut loaded = false;
        for kind in [RecordKind::Policy, RecordKind::Quota] {
            match self.cache.refresh(kind, name).await {
                Ok(()) => loaded = true,
                Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if loaded {
            Ok(())
        } else {
            Err(GatewayError::PolicyNotFound {
                name: name.to_string(),
            })
        }
    }
}

/// Labels scoping reads to one user.
fn user_scope(user: &str) -> Result<Labels, GatewayError> {
    let scope = Labels::for_user(user);
    scope.validate()?;
    Ok(scope)
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod gateway_tests;
