// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Labels attached to every Beiboot object the gateway creates.
//!
//! The `name`, `user` and `group` labels scope every read: a caller only ever
//! sees clusters that carry its own `user` label, and group quotas are counted
//! with the `group` label.

use crate::errors::GatewayError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

// ============================================================================
// Beiboot Object Labels
// ============================================================================

/// Label holding the caller-chosen cluster name
pub const LABEL_NAME: &str = "name";

/// Label holding the identity of the user that created the cluster
pub const LABEL_USER: &str = "user";

/// Label holding the group the cluster is counted against
pub const LABEL_GROUP: &str = "group";

// ============================================================================
// Kubernetes Standard Labels
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on objects created by the gateway
pub const MANAGED_BY_GATEWAY: &str = "beiboot-gateway";

/// Kubernetes label value syntax; empty values are allowed.
static LABEL_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$")
        .expect("label value regex is valid")
});

/// Scoping labels of a Beiboot object. Unset fields are not part of the scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels {
    pub name: Option<String>,
    pub user: Option<String>,
    pub group: Option<String>,
}

impl Labels {
    /// Labels that scope reads to a single user.
    #[must_use]
    pub fn for_user(user: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            ..Self::default()
        }
    }

    /// Labels that scope reads to a single group.
    #[must_use]
    pub fn for_group(group: &str) -> Self {
        Self {
            group: Some(group.to_string()),
            ..Self::default()
        }
    }

    /// Check every set value against the Kubernetes label value syntax.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidLabel`] for the first invalid value.
    pub fn validate(&self) -> Result<(), GatewayError> {
        for (field, value) in self.fields() {
            if !is_valid_label_value(value) {
                return Err(GatewayError::InvalidLabel {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Render as a Kubernetes label selector, e.g. `user=alice,group=free`.
    #[must_use]
    pub fn to_selector(&self) -> String {
        self.fields()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Render as an object label map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.fields()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    /// Rebuild scoping labels from an object label map, ignoring other keys.
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        Self {
            name: map.get(LABEL_NAME).cloned(),
            user: map.get(LABEL_USER).cloned(),
            group: map.get(LABEL_GROUP).cloned(),
        }
    }

    /// Whether an object carrying `other` labels is inside this scope.
    #[must_use]
    pub fn matches(&self, other: &Labels) -> bool {
        self.fields().all(|(key, value)| match key {
            LABEL_NAME => other.name.as_deref() == Some(value),
            LABEL_USER => other.user.as_deref() == Some(value),
            _ => other.group.as_deref() == Some(value),
        })
    }

    fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (LABEL_NAME, self.name.as_deref()),
            (LABEL_USER, self.user.as_deref()),
            (LABEL_GROUP, self.group.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }
}

/// Whether `value` is a valid Kubernetes label value.
#[must_use]
pub fn is_valid_label_value(value: &str) -> bool {
    LABEL_VALUE_RE.is_match(value)
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
