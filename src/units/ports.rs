// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Port mappings between the caller's machine and the ephemeral cluster.
//!
//! A mapping is written `"<local>:<cluster>"`. A list of mappings is
//! normalized into a set: duplicates collapse and the reserved control-plane
//! mapping `6443:6443` is dropped, since the API server port is always
//! forwarded by the backend itself.

use crate::constants::RESERVED_API_SERVER_PORT;
use crate::errors::UnitError;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single `local:cluster` port pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortMapping {
    pub local: u16,
    pub cluster: u16,
}

impl PortMapping {
    #[must_use]
    pub fn new(local: u16, cluster: u16) -> Self {
        Self { local, cluster }
    }

    fn is_reserved(&self) -> bool {
        self.local == RESERVED_API_SERVER_PORT && self.cluster == RESERVED_API_SERVER_PORT
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.local, self.cluster)
    }
}

impl FromStr for PortMapping {
    type Err = UnitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (local, cluster) = value
            .split_once(':')
            .ok_or_else(|| UnitError::format(value, "expected '<local>:<cluster>'"))?;

        Ok(Self {
            local: parse_port(value, local)?,
            cluster: parse_port(value, cluster)?,
        })
    }
}

fn parse_port(raw: &str, port: &str) -> Result<u16, UnitError> {
    port.parse::<u16>()
        .ok()
        .filter(|p| *p >= 1)
        .ok_or_else(|| UnitError::format(raw, format!("'{port}' is not a port in 1-65535")))
}

/// Normalized set of port mappings.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PortMappings(BTreeSet<PortMapping>);

impl PortMappings {
    /// Parse and normalize a list of `local:cluster` entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use beiboot_gateway::units::ports::PortMappings;
    ///
    /// let ports = PortMappings::parse(["80:80", "443:443", "6443:6443", "80:80"]).unwrap();
    /// assert_eq!(ports.to_strings(), vec!["80:80", "443:443"]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`UnitError::InvalidFormat`] for the first malformed entry.
    pub fn parse<I, S>(entries: I) -> Result<Self, UnitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mappings = BTreeSet::new();
        for entry in entries {
            let mapping: PortMapping = entry.as_ref().parse()?;
            if !mapping.is_reserved() {
                mappings.insert(mapping);
            }
        }
        Ok(Self(mappings))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortMapping> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render in `local:cluster` form, in ascending port order.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl Serialize for PortMappings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(ToString::to_string))
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod ports_tests;
