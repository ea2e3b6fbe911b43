// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes version validation.

use crate::errors::UnitError;
use semver::Version;

/// Parse a strict semantic version (`major.minor.patch[-pre][+build]`).
///
/// A leading `v` or a missing patch component is rejected, matching what the
/// orchestration backend accepts as a k3s image tag.
///
/// # Errors
///
/// Returns [`UnitError::InvalidVersion`] if `value` is not a semantic version.
pub fn parse_version(value: &str) -> Result<Version, UnitError> {
    Version::parse(value).map_err(|e| UnitError::InvalidVersion {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
