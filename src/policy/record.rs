// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Administrator policy records.
//!
//! A policy record is stored as a flat key/value map (a `ConfigMap`'s `data`)
//! with upper-cased keys. Keys that are absent fall back to the engine
//! defaults in [`crate::constants`]:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `K8S_VERSIONS` | comma-separated allow-list; empty means unrestricted |
//! | `NODE_COUNT_MIN` / `NODE_COUNT_MAX` | node count bounds (min >= 1, max `<= 0` unbounded) |
//! | `LIFETIME_LIMIT` | ceiling for `LIFETIME` |
//! | `SESSION_TIMEOUT_LIMIT` | ceiling for `SESSION_TIMEOUT` |
//! | `CLUSTER_READY_TIMEOUT_LIMIT` | optional ceiling for `CLUSTER_READY_TIMEOUT`, in seconds |
//! | `<FIELD>_MIN` / `<FIELD>_MAX` | bounds for each resource quantity parameter |

use crate::constants::{
    DEFAULT_LIFETIME_LIMIT, DEFAULT_NODE_COUNT_MAX, DEFAULT_SESSION_TIMEOUT_LIMIT, MIN_NODE_COUNT,
};
use crate::errors::{PolicyError, UnitError};
use crate::parameters::ClusterParameterName;
use crate::units::{format_duration, parse_duration, parse_quantity, parse_version, Quantity};
use chrono::TimeDelta;
use semver::Version;
use std::collections::BTreeMap;
use tracing::warn;

/// Key holding the Kubernetes version allow-list.
pub const K8S_VERSIONS_KEY: &str = "K8S_VERSIONS";
/// Key holding the minimum node count.
pub const NODE_COUNT_MIN_KEY: &str = "NODE_COUNT_MIN";
/// Key holding the maximum node count.
pub const NODE_COUNT_MAX_KEY: &str = "NODE_COUNT_MAX";
/// Key holding the lifetime ceiling.
pub const LIFETIME_LIMIT_KEY: &str = "LIFETIME_LIMIT";
/// Key holding the session timeout ceiling.
pub const SESSION_TIMEOUT_LIMIT_KEY: &str = "SESSION_TIMEOUT_LIMIT";
/// Key holding the cluster-ready timeout ceiling.
pub const CLUSTER_READY_TIMEOUT_LIMIT_KEY: &str = "CLUSTER_READY_TIMEOUT_LIMIT";

/// Optional lower and upper bound of one quantity parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuantityBounds {
    pub min: Option<Quantity>,
    pub max: Option<Quantity>,
}

/// Bounds that a resolved cluster request must satisfy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyRecord {
    /// `None` means every version is allowed.
    pub k8s_versions: Option<Vec<Version>>,
    pub node_count_min: u32,
    pub node_count_max: Option<u32>,
    pub lifetime_limit: TimeDelta,
    pub session_timeout_limit: TimeDelta,
    pub cluster_ready_timeout_limit: Option<u64>,
    pub quantity_bounds: BTreeMap<ClusterParameterName, QuantityBounds>,
}

impl Default for PolicyRecord {
    fn default() -> Self {
        Self {
            k8s_versions: None,
            node_count_min: MIN_NODE_COUNT,
            node_count_max: Some(DEFAULT_NODE_COUNT_MAX),
            lifetime_limit: default_limit(DEFAULT_LIFETIME_LIMIT, TimeDelta::days(1)),
            session_timeout_limit: default_limit(
                DEFAULT_SESSION_TIMEOUT_LIMIT,
                TimeDelta::hours(1),
            ),
            cluster_ready_timeout_limit: None,
            quantity_bounds: BTreeMap::new(),
        }
    }
}

fn default_limit(value: &str, fallback: TimeDelta) -> TimeDelta {
    parse_duration(value).unwrap_or(fallback)
}

impl PolicyRecord {
    /// Build a record from a store key/value map.
    ///
    /// Keys are matched case-insensitively against their upper-cased form.
    /// Empty values count as absent, except `NODE_COUNT_MAX`: an empty or
    /// non-positive maximum leaves the node count unbounded above. Without a
    /// `NODE_COUNT_MAX` key, the default maximum is dropped when
    /// `NODE_COUNT_MIN` exceeds it.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidKey`] when a present value cannot be parsed,
    /// or [`PolicyError::InvertedBounds`] when a minimum exceeds its maximum.
    /// A quantity bound whose mantissa is malformed is logged and ignored; only
    /// a bound with the wrong unit family is an error.
    pub fn from_data(raw_data: &BTreeMap<String, String>) -> Result<Self, PolicyError> {
        let data = normalize_keys(raw_data);
        let mut record = Self::default();

        if let Some(raw) = data.get(K8S_VERSIONS_KEY) {
            let versions = raw
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| parse_version(v).map_err(|e| invalid_key(K8S_VERSIONS_KEY, raw, &e)))
                .collect::<Result<Vec<_>, _>>()?;
            record.k8s_versions = (!versions.is_empty()).then_some(versions);
        }

        if let Some(raw) = data.get(NODE_COUNT_MIN_KEY) {
            let min = parse_count(NODE_COUNT_MIN_KEY, raw)?;
            record.node_count_min = u32::try_from(min.max(i64::from(MIN_NODE_COUNT)))
                .map_err(|_| invalid_reason(NODE_COUNT_MIN_KEY, raw, "too large"))?;
        }

        if has_blank_value(raw_data, NODE_COUNT_MAX_KEY) {
            record.node_count_max = None;
        } else if let Some(raw) = data.get(NODE_COUNT_MAX_KEY) {
            let max = parse_count(NODE_COUNT_MAX_KEY, raw)?;
            record.node_count_max = if max <= 0 {
                None
            } else {
                Some(
                    u32::try_from(max)
                        .map_err(|_| invalid_reason(NODE_COUNT_MAX_KEY, raw, "too large"))?,
                )
            };
        } else if record.node_count_min > DEFAULT_NODE_COUNT_MAX {
            // The default ceiling only applies below an explicit minimum.
            record.node_count_max = None;
        }

        if let Some(raw) = data.get(LIFETIME_LIMIT_KEY) {
            record.lifetime_limit = parse_limit(LIFETIME_LIMIT_KEY, raw)?;
        }

        if let Some(raw) = data.get(SESSION_TIMEOUT_LIMIT_KEY) {
            record.session_timeout_limit = parse_limit(SESSION_TIMEOUT_LIMIT_KEY, raw)?;
        }

        if let Some(raw) = data.get(CLUSTER_READY_TIMEOUT_LIMIT_KEY) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                invalid_reason(CLUSTER_READY_TIMEOUT_LIMIT_KEY, raw, &e.to_string())
            })?;
            record.cluster_ready_timeout_limit = Some(secs);
        }

        for name in ClusterParameterName::QUANTITIES {
            let bounds = QuantityBounds {
                min: parse_bound(name, &format!("{name}_MIN"), &data)?,
                max: parse_bound(name, &format!("{name}_MAX"), &data)?,
            };
            if bounds != QuantityBounds::default() {
                record.quantity_bounds.insert(name, bounds);
            }
        }

        record.validate()?;
        Ok(record)
    }

    /// Bounds configured for a quantity parameter, unbounded if none.
    #[must_use]
    pub fn bounds(&self, name: ClusterParameterName) -> QuantityBounds {
        self.quantity_bounds.get(&name).copied().unwrap_or_default()
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if let Some(max) = self.node_count_max {
            if self.node_count_min > max {
                return Err(PolicyError::InvertedBounds {
                    field: "NODE_COUNT".to_string(),
                    min: self.node_count_min.to_string(),
                    max: max.to_string(),
                });
            }
        }

        for (name, bounds) in &self.quantity_bounds {
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    return Err(PolicyError::InvertedBounds {
                        field: name.to_string(),
                        min: min.to_string(),
                        max: max.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Upper-case keys and drop empty values.
pub(crate) fn normalize_keys(data: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    data.iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.to_uppercase(), v.clone()))
        .collect()
}

/// Whether `key` is present (in any case) with a blank value.
pub(crate) fn has_blank_value(data: &BTreeMap<String, String>, key: &str) -> bool {
    data.iter()
        .any(|(k, v)| k.eq_ignore_ascii_case(key) && v.trim().is_empty())
}

pub(crate) fn parse_count(key: &str, raw: &str) -> Result<i64, PolicyError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| invalid_reason(key, raw, &e.to_string()))
}

fn parse_limit(key: &str, raw: &str) -> Result<TimeDelta, PolicyError> {
    let limit = parse_duration(raw.trim()).map_err(|e| invalid_key(key, raw, &e))?;
    if limit < TimeDelta::zero() {
        return Err(invalid_reason(
            key,
            raw,
            &format!("ceiling {} must be positive", format_duration(limit)),
        ));
    }
    Ok(limit)
}

fn parse_bound(
    name: ClusterParameterName,
    key: &str,
    data: &BTreeMap<String, String>,
) -> Result<Option<Quantity>, PolicyError> {
    let Some(raw) = data.get(key) else {
        return Ok(None);
    };
    let Some(family) = name.quantity_family() else {
        return Ok(None);
    };

    match parse_quantity(raw.trim(), family) {
        Ok(quantity) => Ok(Some(quantity)),
        Err(e @ UnitError::InvalidUnit { .. }) => Err(invalid_key(key, raw, &e)),
        Err(e) => {
            warn!(key = %key, value = %raw, error = %e, "Ignoring malformed policy bound");
            Ok(None)
        }
    }
}

fn invalid_key(key: &str, raw: &str, err: &UnitError) -> PolicyError {
    invalid_reason(key, raw, &err.to_string())
}

pub(crate) fn invalid_reason(key: &str, raw: &str, reason: &str) -> PolicyError {
    PolicyError::InvalidKey {
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
