// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Format validators, one per [`ClusterParameterName`].
//!
//! Validators only check syntax and intrinsic constraints. Policy bounds are
//! applied later by [`crate::policy::resolve`].

use super::{ClusterParameterName, ParameterValue, RawValue};
use crate::errors::UnitError;
use crate::units::{parse_duration, parse_quantity, parse_version, PortMappings, QuantityFamily};

/// A format validator turns a raw value into the typed value for its parameter.
pub type Validator = fn(&RawValue) -> Result<ParameterValue, UnitError>;

/// Look up the validator for a parameter name.
#[must_use]
pub fn validator_for(name: ClusterParameterName) -> Validator {
    match name {
        ClusterParameterName::K8sVersion => validate_version,
        ClusterParameterName::Ports => validate_ports,
        ClusterParameterName::NodeCount => validate_integer,
        ClusterParameterName::Lifetime | ClusterParameterName::SessionTimeout => {
            validate_duration
        }
        ClusterParameterName::ClusterReadyTimeout => validate_seconds,
        ClusterParameterName::ServerResourcesRequestsCpu
        | ClusterParameterName::ServerResourcesLimitsCpu
        | ClusterParameterName::NodeResourcesRequestsCpu
        | ClusterParameterName::NodeResourcesLimitsCpu => validate_compute,
        ClusterParameterName::ServerResourcesRequestsMemory
        | ClusterParameterName::ServerResourcesLimitsMemory
        | ClusterParameterName::ServerStorageRequests
        | ClusterParameterName::NodeResourcesRequestsMemory
        | ClusterParameterName::NodeResourcesLimitsMemory
        | ClusterParameterName::NodeStorageRequests => validate_memory,
        ClusterParameterName::GefyraEnabled | ClusterParameterName::TunnelEnabled => validate_flag,
        ClusterParameterName::GefyraEndpoint | ClusterParameterName::TunnelEndpoint => {
            validate_text
        }
    }
}

fn wrong_type(raw: &RawValue, expected: &str) -> UnitError {
    UnitError::format(raw.to_string(), format!("expected {expected}"))
}

fn validate_version(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    match raw {
        RawValue::Text(s) => parse_version(s).map(ParameterValue::Version),
        other => Err(wrong_type(other, "a version string")),
    }
}

fn validate_ports(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    let ports = match raw {
        RawValue::List(entries) => PortMappings::parse(entries)?,
        RawValue::Text(s) => PortMappings::parse(s.split(',').map(str::trim))?,
        other => return Err(wrong_type(other, "a list of '<local>:<cluster>' entries")),
    };
    Ok(ParameterValue::Ports(ports))
}

fn validate_integer(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    match raw {
        RawValue::Integer(i) => Ok(ParameterValue::Integer(*i)),
        RawValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(ParameterValue::Integer)
            .map_err(|e| UnitError::format(s.as_str(), e.to_string())),
        other => Err(wrong_type(other, "an integer")),
    }
}

fn validate_duration(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    let RawValue::Text(s) = raw else {
        return Err(wrong_type(raw, "a duration string such as '1h30m'"));
    };

    let duration = parse_duration(s)?;
    if duration < chrono::TimeDelta::zero() {
        return Err(UnitError::range(s.as_str(), "duration must be positive"));
    }
    Ok(ParameterValue::Duration(duration))
}

fn validate_seconds(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    let seconds = match raw {
        RawValue::Integer(i) => *i,
        RawValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| UnitError::format(s.as_str(), e.to_string()))?,
        other => return Err(wrong_type(other, "an integer number of seconds")),
    };

    u64::try_from(seconds)
        .map(ParameterValue::Seconds)
        .map_err(|_| UnitError::range(seconds.to_string(), "seconds must not be negative"))
}

fn quantity_text(raw: &RawValue) -> Result<String, UnitError> {
    match raw {
        RawValue::Text(s) => Ok(s.trim().to_string()),
        RawValue::Integer(i) => Ok(i.to_string()),
        RawValue::Decimal(d) => Ok(d.to_string()),
        other => Err(wrong_type(other, "a resource quantity")),
    }
}

fn validate_compute(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    let text = quantity_text(raw)?;
    parse_quantity(&text, QuantityFamily::Compute).map(ParameterValue::Quantity)
}

fn validate_memory(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    let text = quantity_text(raw)?;
    parse_quantity(&text, QuantityFamily::Memory).map(ParameterValue::Quantity)
}

fn validate_flag(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    match raw {
        RawValue::Bool(b) => Ok(ParameterValue::Flag(*b)),
        RawValue::Text(s) if s.eq_ignore_ascii_case("true") => Ok(ParameterValue::Flag(true)),
        RawValue::Text(s) if s.eq_ignore_ascii_case("false") => Ok(ParameterValue::Flag(false)),
        other => Err(wrong_type(other, "a boolean")),
    }
}

fn validate_text(raw: &RawValue) -> Result<ParameterValue, UnitError> {
    match raw {
        RawValue::Text(s) => Ok(ParameterValue::Text(s.clone())),
        other => Err(wrong_type(other, "a string")),
    }
}
