// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the Beiboot gateway.
//!
//! Errors are layered the same way the engine is:
//! - [`UnitError`] - a single textual value failed to parse (duration, quantity,
//!   version, port mapping)
//! - [`ValidationError`] - a named cluster parameter was rejected, either by its
//!   format validator or by the administrator policy
//! - [`PolicyError`] - a policy or quota record from the store is malformed
//! - [`StoreError`] / [`BackendError`] - failures of the two external collaborators
//! - [`GatewayError`] - everything a gateway operation can return
//!
//! Every error exposes an [`ErrorKind`], which the surrounding HTTP layer maps to a
//! status code via [`ErrorKind::status_code`].

use crate::parameters::ClusterParameterName;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of every error the gateway can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed textual value (duration, quantity, port pair, wrong value type)
    InvalidFormat,
    /// Value uses the wrong unit family (memory suffix on a compute field)
    InvalidUnit,
    /// Value is not a strict semantic version
    InvalidVersion,
    /// Value violates an intrinsic, policy-independent constraint
    OutOfRange,
    /// Value lies outside the administrator policy min/max
    OutOfBounds,
    /// Value is not a member of an explicit allow-list
    NotAllowed,
    /// Requested group is not available to the caller
    InvalidGroup,
    /// Referenced policy name is unknown to the cache
    PolicyNotFound,
    /// Policy or quota record in the store is malformed
    InvalidPolicy,
    /// The selected group has reached its live-cluster limit
    GroupQuotaExceeded,
    /// The caller has reached its live-cluster limit
    UserQuotaExceeded,
    /// Referenced cluster is unknown within the caller's label scope
    NotFound,
    /// A collaborator did not answer within its timeout
    Timeout,
    /// A collaborator returned an error
    Upstream,
}

impl ErrorKind {
    /// Stable CamelCase reason string, suitable for API responses and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFormat => "InvalidFormat",
            ErrorKind::InvalidUnit => "InvalidUnit",
            ErrorKind::InvalidVersion => "InvalidVersion",
            ErrorKind::OutOfRange => "OutOfRange",
            ErrorKind::OutOfBounds => "OutOfBounds",
            ErrorKind::NotAllowed => "NotAllowed",
            ErrorKind::InvalidGroup => "InvalidGroup",
            ErrorKind::PolicyNotFound => "PolicyNotFound",
            ErrorKind::InvalidPolicy => "InvalidPolicy",
            ErrorKind::GroupQuotaExceeded => "GroupQuotaExceeded",
            ErrorKind::UserQuotaExceeded => "UserQuotaExceeded",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Upstream => "Upstream",
        }
    }

    /// HTTP status code the transport layer should answer with.
    ///
    /// | Kind | Code |
    /// |------|------|
    /// | parameter and group errors | 400 |
    /// | quota errors | 402 |
    /// | `NotFound`, `PolicyNotFound` | 404 |
    /// | `InvalidPolicy`, `Upstream` | 502 |
    /// | `Timeout` | 504 |
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidFormat
            | ErrorKind::InvalidUnit
            | ErrorKind::InvalidVersion
            | ErrorKind::OutOfRange
            | ErrorKind::OutOfBounds
            | ErrorKind::NotAllowed
            | ErrorKind::InvalidGroup => 400,
            ErrorKind::GroupQuotaExceeded | ErrorKind::UserQuotaExceeded => 402,
            ErrorKind::PolicyNotFound | ErrorKind::NotFound => 404,
            ErrorKind::InvalidPolicy | ErrorKind::Upstream => 502,
            ErrorKind::Timeout => 504,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the unit parsers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// The value cannot be parsed at all
    #[error("invalid format '{value}': {reason}")]
    InvalidFormat {
        /// The rejected raw value
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// The value carries a unit from the wrong family
    #[error("invalid unit in '{value}': expected {expected}")]
    InvalidUnit {
        /// The rejected raw value
        value: String,
        /// Human-readable description of the accepted units
        expected: &'static str,
    },

    /// The value is not a strict semantic version
    #[error("invalid version '{value}': {reason}")]
    InvalidVersion {
        /// The rejected raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// The value parsed but violates an intrinsic constraint
    #[error("value '{value}' out of range: {reason}")]
    OutOfRange {
        /// The rejected raw value
        value: String,
        /// The violated constraint
        reason: String,
    },
}

impl UnitError {
    pub(crate) fn format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        UnitError::InvalidFormat {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn range(value: impl Into<String>, reason: impl Into<String>) -> Self {
        UnitError::OutOfRange {
            value: value.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnitError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            UnitError::InvalidUnit { .. } => ErrorKind::InvalidUnit,
            UnitError::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            UnitError::OutOfRange { .. } => ErrorKind::OutOfRange,
        }
    }
}

/// A cluster parameter was rejected.
///
/// Only the first offending parameter of a request is ever reported; parameters
/// are checked in the fixed order of [`ClusterParameterName::ALL`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The parameter's format validator rejected the raw value
    #[error("Invalid {parameter} '{raw}': {source}")]
    Format {
        /// The offending parameter
        parameter: ClusterParameterName,
        /// The raw value as submitted
        raw: String,
        /// The parser failure
        #[source]
        source: UnitError,
    },

    /// The value lies outside the policy bounds
    #[error("Invalid {parameter} - min: '{min}', max: '{max}', value: '{value}'")]
    OutOfBounds {
        /// The offending parameter
        parameter: ClusterParameterName,
        /// Configured minimum (`unbounded` when absent)
        min: String,
        /// Configured maximum (`unbounded` when absent)
        max: String,
        /// The rejected value, normalized
        value: String,
    },

    /// The value is not in the policy allow-list
    #[error("Invalid {parameter} '{value}' - allowed: {allowed:?}")]
    NotAllowed {
        /// The offending parameter
        parameter: ClusterParameterName,
        /// The rejected value
        value: String,
        /// The configured allow-list
        allowed: Vec<String>,
    },
}

impl ValidationError {
    /// The parameter this error refers to.
    #[must_use]
    pub fn parameter(&self) -> ClusterParameterName {
        match self {
            ValidationError::Format { parameter, .. }
            | ValidationError::OutOfBounds { parameter, .. }
            | ValidationError::NotAllowed { parameter, .. } => *parameter,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::Format { source, .. } => source.kind(),
            ValidationError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            ValidationError::NotAllowed { .. } => ErrorKind::NotAllowed,
        }
    }
}

/// A policy or quota record from the store could not be turned into bounds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A single key holds an unusable value
    #[error("Invalid policy key {key}='{value}': {reason}")]
    InvalidKey {
        /// Upper-cased store key
        key: String,
        /// Raw value from the store
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// A minimum is larger than its maximum
    #[error("Invalid policy bounds for {field}: min '{min}' > max '{max}'")]
    InvertedBounds {
        /// Field the bounds belong to
        field: String,
        /// Configured minimum
        min: String,
        /// Configured maximum
        max: String,
    },
}

/// Errors returned by a [`crate::policy::PolicyStore`].
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// No record with that name exists in the store
    #[error("ConfigMap {name} not found in namespace {namespace}")]
    NotFound {
        /// Full record name (prefix included)
        name: String,
        /// Namespace that was searched
        namespace: String,
    },

    /// The store did not answer in time
    #[error("Timed out after {timeout:?} reading {name}")]
    Timeout {
        /// Full record name (prefix included)
        name: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The store answered with an error
    #[error("Policy store error reading {name}: {reason}")]
    Api {
        /// Full record name (prefix included)
        name: String,
        /// Error reported by the store
        reason: String,
    },

    /// The record exists but is malformed
    #[error("Record {name} is invalid: {source}")]
    Invalid {
        /// Record name as cached (prefix stripped)
        name: String,
        /// What is wrong with it
        #[source]
        source: PolicyError,
    },
}

impl StoreError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::PolicyNotFound,
            StoreError::Timeout { .. } => ErrorKind::Timeout,
            StoreError::Api { .. } => ErrorKind::Upstream,
            StoreError::Invalid { .. } => ErrorKind::InvalidPolicy,
        }
    }
}

/// Errors returned by a [`crate::backend::ClusterBackend`].
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// The backend did not answer in time
    #[error("Cluster backend timed out after {timeout:?} during {operation}")]
    Timeout {
        /// Backend operation (`create`, `list`, `read`, `delete`)
        operation: &'static str,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The backend answered with an error
    #[error("Cluster backend error during {operation}: {reason}")]
    Api {
        /// Backend operation (`create`, `list`, `read`, `delete`)
        operation: &'static str,
        /// Error reported by the backend
        reason: String,
    },

    /// A freshly generated cluster id is already taken
    #[error("Cluster ID collision for '{id}'. Please try again.")]
    IdCollision {
        /// The colliding id
        id: String,
    },
}

impl BackendError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Timeout { .. } => ErrorKind::Timeout,
            BackendError::Api { .. } | BackendError::IdCollision { .. } => ErrorKind::Upstream,
        }
    }
}

/// Everything a [`crate::gateway::ClusterGateway`] operation can fail with.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A label value does not match the label pattern
    #[error("Invalid label {field}='{value}'")]
    InvalidLabel {
        /// Label field (`name`, `user`, `group`)
        field: &'static str,
        /// The rejected value
        value: String,
    },

    /// The requested group is not available to the caller
    #[error("Invalid group: {group}. Available groups: {}.", available.join(", "))]
    InvalidGroup {
        /// The requested group
        group: String,
        /// Groups the caller may use
        available: Vec<String>,
    },

    /// No cached record for the policy name (or its default fallback)
    #[error("Policy '{name}' not found")]
    PolicyNotFound {
        /// The policy name that was looked up
        name: String,
    },

    /// The selected group has too many live clusters
    #[error("Group cluster limit reached for '{group}' ({live}/{limit}).")]
    GroupQuotaExceeded {
        /// Selected group
        group: String,
        /// Configured limit
        limit: u32,
        /// Live clusters counted for the group
        live: usize,
    },

    /// The caller has too many live clusters
    #[error("User cluster limit reached ({live}/{limit}).")]
    UserQuotaExceeded {
        /// Configured limit
        limit: u32,
        /// Live clusters counted for the user
        live: usize,
    },

    /// The cluster id is unknown within the caller's label scope
    #[error("Cluster '{id}' not found.")]
    NotFound {
        /// The requested cluster id
        id: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl GatewayError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(e) => e.kind(),
            GatewayError::InvalidLabel { .. } => ErrorKind::InvalidFormat,
            GatewayError::InvalidGroup { .. } => ErrorKind::InvalidGroup,
            GatewayError::PolicyNotFound { .. } => ErrorKind::PolicyNotFound,
            GatewayError::GroupQuotaExceeded { .. } => ErrorKind::GroupQuotaExceeded,
            GatewayError::UserQuotaExceeded { .. } => ErrorKind::UserQuotaExceeded,
            GatewayError::NotFound { .. } => ErrorKind::NotFound,
            GatewayError::Store(e) => e.kind(),
            GatewayError::Backend(e) => e.kind(),
        }
    }

    /// HTTP status code for this error, see [`ErrorKind::status_code`].
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
