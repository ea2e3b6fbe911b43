// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed cluster parameters.
//!
//! A cluster request carries an ordered list of `{name, value}` pairs. Each
//! [`ClusterParameterName`] owns exactly one format validator (see
//! [`validators`]), invoked when the [`ParameterCollection`] is built. The
//! validator fixes the concrete [`ParameterValue`] type for that name, so a
//! collection never holds, say, a duration under `NODE_COUNT`.
//!
//! # Example
//!
//! ```
//! use beiboot_gateway::parameters::{
//!     ClusterParameterName, ParameterCollection, RawParameter, RawValue,
//! };
//!
//! let collection = ParameterCollection::from_raw(vec![
//!     RawParameter::new(ClusterParameterName::NodeCount, RawValue::Integer(2)),
//!     RawParameter::new(ClusterParameterName::Lifetime, RawValue::Text("2h".into())),
//! ])
//! .unwrap();
//!
//! assert!(collection.get(ClusterParameterName::NodeCount).is_some());
//! assert!(collection.get(ClusterParameterName::Ports).is_none());
//! ```

pub mod validators;

use crate::constants::{
    DEFAULT_CLUSTER_READY_TIMEOUT_SECS, DEFAULT_GEFYRA_ENABLED, DEFAULT_LIFETIME, DEFAULT_PORTS,
    DEFAULT_SESSION_TIMEOUT, DEFAULT_TUNNEL_ENABLED,
};
use crate::errors::{UnitError, ValidationError};
use crate::units::{parse_duration, PortMappings, Quantity, QuantityFamily};
use chrono::TimeDelta;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of parameter names a cluster request may carry.
///
/// Declaration order is the order in which parameters are validated and
/// resolved, which keeps error reporting deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterParameterName {
    K8sVersion,
    Ports,
    NodeCount,
    Lifetime,
    SessionTimeout,
    ClusterReadyTimeout,
    ServerResourcesRequestsCpu,
    ServerResourcesRequestsMemory,
    ServerResourcesLimitsCpu,
    ServerResourcesLimitsMemory,
    ServerStorageRequests,
    NodeResourcesRequestsCpu,
    NodeResourcesRequestsMemory,
    NodeResourcesLimitsCpu,
    NodeResourcesLimitsMemory,
    NodeStorageRequests,
    GefyraEnabled,
    GefyraEndpoint,
    TunnelEnabled,
    TunnelEndpoint,
}

impl ClusterParameterName {
    /// Every parameter name, in validation order.
    pub const ALL: [ClusterParameterName; 20] = [
        Self::K8sVersion,
        Self::Ports,
        Self::NodeCount,
        Self::Lifetime,
        Self::SessionTimeout,
        Self::ClusterReadyTimeout,
        Self::ServerResourcesRequestsCpu,
        Self::ServerResourcesRequestsMemory,
        Self::ServerResourcesLimitsCpu,
        Self::ServerResourcesLimitsMemory,
        Self::ServerStorageRequests,
        Self::NodeResourcesRequestsCpu,
        Self::NodeResourcesRequestsMemory,
        Self::NodeResourcesLimitsCpu,
        Self::NodeResourcesLimitsMemory,
        Self::NodeStorageRequests,
        Self::GefyraEnabled,
        Self::GefyraEndpoint,
        Self::TunnelEnabled,
        Self::TunnelEndpoint,
    ];

    /// The ten resource quantity parameters that carry policy min/max bounds.
    pub const QUANTITIES: [ClusterParameterName; 10] = [
        Self::ServerResourcesRequestsCpu,
        Self::ServerResourcesRequestsMemory,
        Self::ServerResourcesLimitsCpu,
        Self::ServerResourcesLimitsMemory,
        Self::ServerStorageRequests,
        Self::NodeResourcesRequestsCpu,
        Self::NodeResourcesRequestsMemory,
        Self::NodeResourcesLimitsCpu,
        Self::NodeResourcesLimitsMemory,
        Self::NodeStorageRequests,
    ];

    /// Upper-cased wire name, also used as display name in errors.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::K8sVersion => "K8S_VERSION",
            Self::Ports => "PORTS",
            Self::NodeCount => "NODE_COUNT",
            Self::Lifetime => "LIFETIME",
            Self::SessionTimeout => "SESSION_TIMEOUT",
            Self::ClusterReadyTimeout => "CLUSTER_READY_TIMEOUT",
            Self::ServerResourcesRequestsCpu => "SERVER_RESOURCES_REQUESTS_CPU",
            Self::ServerResourcesRequestsMemory => "SERVER_RESOURCES_REQUESTS_MEMORY",
            Self::ServerResourcesLimitsCpu => "SERVER_RESOURCES_LIMITS_CPU",
            Self::ServerResourcesLimitsMemory => "SERVER_RESOURCES_LIMITS_MEMORY",
            Self::ServerStorageRequests => "SERVER_STORAGE_REQUESTS",
            Self::NodeResourcesRequestsCpu => "NODE_RESOURCES_REQUESTS_CPU",
            Self::NodeResourcesRequestsMemory => "NODE_RESOURCES_REQUESTS_MEMORY",
            Self::NodeResourcesLimitsCpu => "NODE_RESOURCES_LIMITS_CPU",
            Self::NodeResourcesLimitsMemory => "NODE_RESOURCES_LIMITS_MEMORY",
            Self::NodeStorageRequests => "NODE_STORAGE_REQUESTS",
            Self::GefyraEnabled => "GEFYRA_ENABLED",
            Self::GefyraEndpoint => "GEFYRA_ENDPOINT",
            Self::TunnelEnabled => "TUNNEL_ENABLED",
            Self::TunnelEndpoint => "TUNNEL_ENDPOINT",
        }
    }

    /// Suffix family for the quantity parameters, `None` for everything else.
    #[must_use]
    pub fn quantity_family(&self) -> Option<QuantityFamily> {
        match self {
            Self::ServerResourcesRequestsCpu
            | Self::ServerResourcesLimitsCpu
            | Self::NodeResourcesRequestsCpu
            | Self::NodeResourcesLimitsCpu => Some(QuantityFamily::Compute),
            Self::ServerResourcesRequestsMemory
            | Self::ServerResourcesLimitsMemory
            | Self::ServerStorageRequests
            | Self::NodeResourcesRequestsMemory
            | Self::NodeResourcesLimitsMemory
            | Self::NodeStorageRequests => Some(QuantityFamily::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for ClusterParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterParameterName {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnitError::format(s, "unknown cluster parameter"))
    }
}

/// A parameter value as submitted by the caller, before validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Decimal(d) => write!(f, "{d}"),
            RawValue::Text(s) => f.write_str(s),
            RawValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// One `{name, value}` pair of a cluster request.
///
/// A missing or `null` value means "unset", which is distinct from zero or an
/// empty string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawParameter {
    pub name: ClusterParameterName,
    #[serde(default)]
    pub value: Option<RawValue>,
}

impl RawParameter {
    #[must_use]
    pub fn new(name: ClusterParameterName, value: RawValue) -> Self {
        Self {
            name,
            value: Some(value),
        }
    }

    #[must_use]
    pub fn unset(name: ClusterParameterName) -> Self {
        Self { name, value: None }
    }
}

/// A validated parameter value. The variant is fixed per parameter name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterValue {
    Version(Version),
    Ports(PortMappings),
    Integer(i64),
    Duration(TimeDelta),
    Seconds(u64),
    Quantity(Quantity),
    Flag(bool),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Version(v) => write!(f, "{v}"),
            ParameterValue::Ports(p) => write!(f, "[{}]", p.to_strings().join(", ")),
            ParameterValue::Integer(i) => write!(f, "{i}"),
            ParameterValue::Duration(d) => f.write_str(&crate::units::format_duration(*d)),
            ParameterValue::Seconds(s) => write!(f, "{s}"),
            ParameterValue::Quantity(q) => write!(f, "{q}"),
            ParameterValue::Flag(b) => write!(f, "{b}"),
            ParameterValue::Text(s) => f.write_str(s),
        }
    }
}

/// A validated, named parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: ClusterParameterName,
    pub value: Option<ParameterValue>,
}

impl Parameter {
    /// Validate a raw value for `name` with that name's validator.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Format`] naming the parameter and raw value
    /// when the validator rejects it.
    pub fn parse(
        name: ClusterParameterName,
        raw: Option<&RawValue>,
    ) -> Result<Self, ValidationError> {
        let Some(raw) = raw else {
            return Ok(Self { name, value: None });
        };

        let validate = validators::validator_for(name);
        let value = validate(raw).map_err(|source| ValidationError::Format {
            parameter: name,
            raw: raw.to_string(),
            source,
        })?;

        Ok(Self {
            name,
            value: Some(value),
        })
    }
}

/// Name-keyed parameters of one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterCollection {
    parameters: BTreeMap<ClusterParameterName, Parameter>,
}

impl ParameterCollection {
    /// Build a collection from the caller's ordered parameter list.
    ///
    /// Later entries for the same name replace earlier ones. Construction stops
    /// at the first parameter whose validator fails; no partial collection is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first invalid parameter.
    pub fn from_raw<I>(raw: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = RawParameter>,
    {
        let mut collection = Self::default();
        for parameter in raw {
            collection.insert(Parameter::parse(parameter.name, parameter.value.as_ref())?);
        }
        Ok(collection)
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, parameter: Parameter) {
        self.parameters.insert(parameter.name, parameter);
    }

    /// The value for `name`, or `None` if it is missing or explicitly unset.
    #[must_use]
    pub fn get(&self, name: ClusterParameterName) -> Option<&ParameterValue> {
        self.parameters.get(&name).and_then(|p| p.value.as_ref())
    }

    /// Fill every missing or unset parameter that has a model default.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        for name in ClusterParameterName::ALL {
            if self.get(name).is_none() {
                if let Some(value) = default_value(name) {
                    self.insert(Parameter {
                        name,
                        value: Some(value),
                    });
                }
            }
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Model default for a parameter, independent of any policy.
///
/// Parameters without a default (versions, node count, quantities, endpoints)
/// return `None`.
#[must_use]
pub fn default_value(name: ClusterParameterName) -> Option<ParameterValue> {
    match name {
        ClusterParameterName::Ports => PortMappings::parse(DEFAULT_PORTS)
            .ok()
            .map(ParameterValue::Ports),
        ClusterParameterName::Lifetime => parse_duration(DEFAULT_LIFETIME)
            .ok()
            .map(ParameterValue::Duration),
        ClusterParameterName::SessionTimeout => parse_duration(DEFAULT_SESSION_TIMEOUT)
            .ok()
            .map(ParameterValue::Duration),
        ClusterParameterName::ClusterReadyTimeout => {
            Some(ParameterValue::Seconds(DEFAULT_CLUSTER_READY_TIMEOUT_SECS))
        }
        ClusterParameterName::GefyraEnabled => Some(ParameterValue::Flag(DEFAULT_GEFYRA_ENABLED)),
        ClusterParameterName::TunnelEnabled => Some(ParameterValue::Flag(DEFAULT_TUNNEL_ENABLED)),
        _ => None,
    }
}
