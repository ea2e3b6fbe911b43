// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Group selection and quota admission.
//!
//! Every caller belongs to one or more groups, forwarded by the identity proxy
//! as a comma-separated header. The gateway only recognizes a configured list
//! of *known* groups, in priority order, plus a default group that everyone
//! belongs to. The selected group decides which policy and quota apply.
//!
//! Admission is a check-then-act decision: live clusters are counted before
//! the create is forwarded, so two concurrent requests may both be admitted
//! right at the limit.

use crate::constants::{DEFAULT_GROUP_CLUSTER_LIMIT, DEFAULT_USER_CLUSTER_LIMIT};
use crate::errors::{GatewayError, PolicyError};
use crate::policy::record::{has_blank_value, invalid_reason, normalize_keys, parse_count};
use std::collections::BTreeMap;
use tracing::debug;

/// Key holding the per-group live cluster limit.
pub const GROUP_CLUSTER_LIMIT_KEY: &str = "GROUP_CLUSTER_LIMIT";
/// Key holding the per-user live cluster limit.
pub const USER_CLUSTER_LIMIT_KEY: &str = "USER_CLUSTER_LIMIT";

/// Live cluster limits of one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupQuota {
    /// `None` means unlimited.
    pub group_cluster_limit: Option<u32>,
    pub user_cluster_limit: u32,
}

impl Default for GroupQuota {
    fn default() -> Self {
        Self {
            group_cluster_limit: Some(DEFAULT_GROUP_CLUSTER_LIMIT),
            user_cluster_limit: DEFAULT_USER_CLUSTER_LIMIT,
        }
    }
}

impl GroupQuota {
    /// Build a quota from a store key/value map, falling back to `defaults` for
    /// absent keys.
    ///
    /// An empty or `<= 0` group limit means unlimited; a negative user limit
    /// clamps to 0.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidKey`] if a present value is not an integer.
    pub fn from_data(
        data: &BTreeMap<String, String>,
        defaults: GroupQuota,
    ) -> Result<Self, PolicyError> {
        let blank_group_limit = has_blank_value(data, GROUP_CLUSTER_LIMIT_KEY);
        let data = normalize_keys(data);
        let mut quota = defaults;

        if blank_group_limit {
            quota.group_cluster_limit = None;
        } else if let Some(raw) = data.get(GROUP_CLUSTER_LIMIT_KEY) {
            let limit = parse_count(GROUP_CLUSTER_LIMIT_KEY, raw)?;
            quota.group_cluster_limit = if limit <= 0 {
                None
            } else {
                Some(
                    u32::try_from(limit)
                        .map_err(|_| invalid_reason(GROUP_CLUSTER_LIMIT_KEY, raw, "too large"))?,
                )
            };
        }

        if let Some(raw) = data.get(USER_CLUSTER_LIMIT_KEY) {
            let limit = parse_count(USER_CLUSTER_LIMIT_KEY, raw)?;
            quota.user_cluster_limit = u32::try_from(limit.max(0))
                .map_err(|_| invalid_reason(USER_CLUSTER_LIMIT_KEY, raw, "too large"))?;
        }

        Ok(quota)
    }
}

/// Resolves a caller's forwarded groups to the group that governs a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSelector {
    /// Known groups in priority order, default group last.
    priority: Vec<String>,
    default_group: String,
    role_prefix: String,
}

impl GroupSelector {
    /// Create a selector. The default group is appended to `known_groups` if
    /// it is not already listed.
    #[must_use]
    pub fn new<I, S>(known_groups: I, default_group: &str, role_prefix: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut priority: Vec<String> = Vec::new();
        for group in known_groups {
            let group = group.into();
            if !group.is_empty() && !priority.contains(&group) {
                priority.push(group);
            }
        }
        priority.retain(|g| g != default_group);
        priority.push(default_group.to_string());

        Self {
            priority,
            default_group: default_group.to_string(),
            role_prefix: role_prefix.to_string(),
        }
    }

    #[must_use]
    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    /// Every group the selector recognizes, in priority order.
    #[must_use]
    pub fn known_groups(&self) -> &[String] {
        &self.priority
    }

    /// Split a forwarded groups header and strip the role prefix.
    ///
    /// `"api-group-developer, api-group-free"` becomes `["developer", "free"]`.
    #[must_use]
    pub fn parse_header(&self, header: &str) -> Vec<String> {
        header
            .split(',')
            .map(str::trim)
            .map(|g| g.strip_prefix(self.role_prefix.as_str()).unwrap_or(g))
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect()
    }

    /// Groups available to a caller, in priority order. Always ends with the
    /// default group.
    #[must_use]
    pub fn available(&self, caller_groups: &[String]) -> Vec<String> {
        self.priority
            .iter()
            .filter(|g| **g == self.default_group || caller_groups.contains(g))
            .cloned()
            .collect()
    }

    /// Highest-priority known group of the caller, or the default group.
    #[must_use]
    pub fn select(&self, caller_groups: &[String]) -> String {
        let selected = self
            .priority
            .iter()
            .find(|g| caller_groups.contains(g))
            .unwrap_or(&self.default_group)
            .clone();
        debug!(groups = ?caller_groups, selected = %selected, "Selected group");
        selected
    }

    /// Check an explicitly requested group, or select one when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidGroup`] when the requested group is not
    /// available to the caller.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        caller_groups: &[String],
    ) -> Result<String, GatewayError> {
        let Some(requested) = requested.filter(|g| !g.is_empty()) else {
            return Ok(self.select(caller_groups));
        };

        let available = self.available(caller_groups);
        if available.iter().any(|g| g == requested) {
            Ok(requested.to_string())
        } else {
            Err(GatewayError::InvalidGroup {
                group: requested.to_string(),
                available,
            })
        }
    }
}

/// Live clusters currently counted against a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveCounts {
    pub group: usize,
    pub user: usize,
}

/// Decide whether a create may proceed.
///
/// # Errors
///
/// - [`GatewayError::GroupQuotaExceeded`] if the group limit is set and reached
/// - [`GatewayError::UserQuotaExceeded`] if the user limit is reached
pub fn check_admission(
    group: &str,
    quota: &GroupQuota,
    counts: LiveCounts,
) -> Result<(), GatewayError> {
    if let Some(limit) = quota.group_cluster_limit {
        if counts.group >= limit as usize {
            return Err(GatewayError::GroupQuotaExceeded {
                group: group.to_string(),
                limit,
                live: counts.group,
            });
        }
    }

    if counts.user >= quota.user_cluster_limit as usize {
        return Err(GatewayError::UserQuotaExceeded {
            limit: quota.user_cluster_limit,
            live: counts.user,
        });
    }

    Ok(())
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod quota_tests;
