// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Policy bounds resolution.
//!
//! [`resolve`] merges a [`PolicyRecord`] with a request's
//! [`ParameterCollection`] into [`ResolvedParameters`]. Every field follows one
//! of two rules:
//!
//! - **bounded** (node count, resource quantities): an absent value takes the
//!   policy minimum, or the model default when there is no minimum; a present
//!   value must satisfy `min <= value <= max` where each missing bound is
//!   unbounded on its side.
//! - **ceiling** (lifetime, session timeout, cluster-ready timeout): an absent
//!   value takes the model default capped at the ceiling; a present value must
//!   not exceed the ceiling. Ceilings are never lower bounds.
//!
//! Fields are checked in [`ClusterParameterName::ALL`] order and the first
//! violation is returned.

use super::record::{PolicyRecord, QuantityBounds};
use crate::errors::ValidationError;
use crate::parameters::{default_value, ClusterParameterName, ParameterCollection, ParameterValue};
use crate::units::{format_duration, PortMappings, Quantity};
use chrono::TimeDelta;
use semver::Version;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;

const UNBOUNDED: &str = "unbounded";

/// A cluster request after policy resolution, ready for the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParameters {
    pub k8s_version: Option<Version>,
    pub ports: PortMappings,
    pub node_count: u32,
    #[serde(serialize_with = "serialize_duration")]
    pub lifetime: TimeDelta,
    #[serde(serialize_with = "serialize_duration")]
    pub session_timeout: TimeDelta,
    pub cluster_ready_timeout: u64,
    /// Only quantities that are set, either by the caller or by a policy minimum.
    pub quantities: BTreeMap<ClusterParameterName, Quantity>,
    pub gefyra_enabled: bool,
    pub gefyra_endpoint: Option<String>,
    pub tunnel_enabled: bool,
    pub tunnel_endpoint: Option<String>,
}

fn serialize_duration<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*value))
}

impl ResolvedParameters {
    /// Resolved quantity for a resource parameter, if set.
    #[must_use]
    pub fn quantity(&self, name: ClusterParameterName) -> Option<Quantity> {
        self.quantities.get(&name).copied()
    }
}

/// Resolve a request against a policy.
///
/// # Examples
///
/// ```
/// use beiboot_gateway::parameters::{
///     ClusterParameterName, ParameterCollection, RawParameter, RawValue,
/// };
/// use beiboot_gateway::policy::{resolve, PolicyRecord};
///
/// let mut policy = PolicyRecord::default();
/// policy.node_count_min = 2;
/// policy.node_count_max = Some(5);
///
/// let resolved = resolve(&policy, &ParameterCollection::default()).unwrap();
/// assert_eq!(resolved.node_count, 2);
///
/// let too_many = ParameterCollection::from_raw(vec![RawParameter::new(
///     ClusterParameterName::NodeCount,
///     RawValue::Integer(6),
/// )])
/// .unwrap();
/// assert!(resolve(&policy, &too_many).is_err());
/// ```
///
/// # Errors
///
/// - [`ValidationError::NotAllowed`] if the version is not in the allow-list
/// - [`ValidationError::OutOfBounds`] for the first bounded or ceiling field
///   that lies outside the policy
pub fn resolve(
    policy: &PolicyRecord,
    collection: &ParameterCollection,
) -> Result<ResolvedParameters, ValidationError> {
    let k8s_version = resolve_version(policy, collection)?;

    let ports = match value_or_default(collection, ClusterParameterName::Ports) {
        Some(ParameterValue::Ports(ports)) => ports,
        _ => PortMappings::default(),
    };

    let node_count = resolve_node_count(policy, collection)?;
    let lifetime = resolve_ceiling(
        collection,
        ClusterParameterName::Lifetime,
        policy.lifetime_limit,
    )?;
    let session_timeout = resolve_ceiling(
        collection,
        ClusterParameterName::SessionTimeout,
        policy.session_timeout_limit,
    )?;
    let cluster_ready_timeout = resolve_ready_timeout(policy, collection)?;

    let mut quantities = BTreeMap::new();
    for name in ClusterParameterName::QUANTITIES {
        if let Some(quantity) = resolve_quantity(collection, name, policy.bounds(name))? {
            quantities.insert(name, quantity);
        }
    }

    let resolved = ResolvedParameters {
        k8s_version,
        ports,
        node_count,
        lifetime,
        session_timeout,
        cluster_ready_timeout,
        quantities,
        gefyra_enabled: flag(collection, ClusterParameterName::GefyraEnabled),
        gefyra_endpoint: text(collection, ClusterParameterName::GefyraEndpoint),
        tunnel_enabled: flag(collection, ClusterParameterName::TunnelEnabled),
        tunnel_endpoint: text(collection, ClusterParameterName::TunnelEndpoint),
    };

    debug!(
        node_count = resolved.node_count,
        lifetime = %format_duration(resolved.lifetime),
        quantities = resolved.quantities.len(),
        "Resolved cluster parameters"
    );

    Ok(resolved)
}

fn value_or_default(
    collection: &ParameterCollection,
    name: ClusterParameterName,
) -> Option<ParameterValue> {
    collection.get(name).cloned().or_else(|| default_value(name))
}

fn out_of_bounds(
    parameter: ClusterParameterName,
    min: Option<impl Display>,
    max: Option<impl Display>,
    value: impl Display,
) -> ValidationError {
    ValidationError::OutOfBounds {
        parameter,
        min: min.map_or_else(|| UNBOUNDED.to_string(), |m| m.to_string()),
        max: max.map_or_else(|| UNBOUNDED.to_string(), |m| m.to_string()),
        value: value.to_string(),
    }
}

fn resolve_version(
    policy: &PolicyRecord,
    collection: &ParameterCollection,
) -> Result<Option<Version>, ValidationError> {
    let Some(ParameterValue::Version(version)) = collection.get(ClusterParameterName::K8sVersion)
    else {
        return Ok(None);
    };

    if let Some(allowed) = &policy.k8s_versions {
        if !allowed.contains(version) {
            return Err(ValidationError::NotAllowed {
                parameter: ClusterParameterName::K8sVersion,
                value: version.to_string(),
                allowed: allowed.iter().map(ToString::to_string).collect(),
            });
        }
    }

    Ok(Some(version.clone()))
}

fn resolve_node_count(
    policy: &PolicyRecord,
    collection: &ParameterCollection,
) -> Result<u32, ValidationError> {
    let Some(ParameterValue::Integer(requested)) = collection.get(ClusterParameterName::NodeCount)
    else {
        return Ok(policy.node_count_min);
    };

    let requested = *requested;
    let below = requested < i64::from(policy.node_count_min);
    let above = policy
        .node_count_max
        .is_some_and(|max| requested > i64::from(max));

    match u32::try_from(requested) {
        Ok(count) if !below && !above => Ok(count),
        _ => Err(out_of_bounds(
            ClusterParameterName::NodeCount,
            Some(policy.node_count_min),
            policy.node_count_max,
            requested,
        )),
    }
}

fn resolve_ceiling(
    collection: &ParameterCollection,
    name: ClusterParameterName,
    ceiling: TimeDelta,
) -> Result<TimeDelta, ValidationError> {
    match collection.get(name) {
        Some(ParameterValue::Duration(requested)) => {
            if *requested > ceiling {
                Err(out_of_bounds(
                    name,
                    None::<String>,
                    Some(format_duration(ceiling)),
                    format_duration(*requested),
                ))
            } else {
                Ok(*requested)
            }
        }
        _ => {
            let default = match default_value(name) {
                Some(ParameterValue::Duration(d)) => d,
                _ => ceiling,
            };
            Ok(default.min(ceiling))
        }
    }
}

fn resolve_ready_timeout(
    policy: &PolicyRecord,
    collection: &ParameterCollection,
) -> Result<u64, ValidationError> {
    let name = ClusterParameterName::ClusterReadyTimeout;
    let ceiling = policy.cluster_ready_timeout_limit;

    match collection.get(name) {
        Some(ParameterValue::Seconds(requested)) => match ceiling {
            Some(limit) if *requested > limit => Err(out_of_bounds(
                name,
                None::<u64>,
                Some(limit),
                *requested,
            )),
            _ => Ok(*requested),
        },
        _ => {
            let default = match default_value(name) {
                Some(ParameterValue::Seconds(s)) => s,
                _ => 0,
            };
            Ok(ceiling.map_or(default, |limit| default.min(limit)))
        }
    }
}

fn resolve_quantity(
    collection: &ParameterCollection,
    name: ClusterParameterName,
    bounds: QuantityBounds,
) -> Result<Option<Quantity>, ValidationError> {
    let Some(ParameterValue::Quantity(requested)) = collection.get(name) else {
        return Ok(bounds.min);
    };

    let below = bounds.min.is_some_and(|min| *requested < min);
    let above = bounds.max.is_some_and(|max| *requested > max);
    if below || above {
        return Err(out_of_bounds(name, bounds.min, bounds.max, requested));
    }

    Ok(Some(*requested))
}

fn flag(collection: &ParameterCollection, name: ClusterParameterName) -> bool {
    matches!(
        value_or_default(collection, name),
        Some(ParameterValue::Flag(true))
    )
}

fn text(collection: &ParameterCollection, name: ClusterParameterName) -> Option<String> {
    match collection.get(name) {
        Some(ParameterValue::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
