// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process configuration.
//!
//! Every flag can also be set through the environment variable named next to
//! it, which is how the gateway is normally configured in a Deployment.

use crate::constants::{
    DEFAULT_COLLABORATOR_TIMEOUT_SECS, DEFAULT_CONFIG_PREFIX, DEFAULT_GROUP_CLUSTER_LIMIT,
    DEFAULT_GROUP_PREFIX, DEFAULT_GROUP_ROLE_PREFIX, DEFAULT_KNOWN_GROUPS, DEFAULT_LISTEN_ADDR,
    DEFAULT_NAMESPACE, DEFAULT_POLICY_NAME, DEFAULT_USER_CLUSTER_LIMIT,
};
use crate::gateway::GatewayConfig;
use crate::policy::RecordLocation;
use crate::quota::GroupQuota;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(
    name = "beiboot-gateway",
    version,
    about = "Parameter resolution and quota admission for ephemeral Beiboot clusters"
)]
pub struct Settings {
    /// Address of the operations server (health, metrics, admin)
    #[arg(long = "listen", env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Namespace holding Beiboot objects
    #[arg(long, env = "CLUSTER_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub cluster_namespace: String,

    /// Name prefix of policy config maps
    #[arg(long, env = "CONFIG_PREFIX", default_value = DEFAULT_CONFIG_PREFIX)]
    pub config_prefix: String,

    /// Policy used when the selected group has none
    #[arg(long, env = "CONFIG_DEFAULT_NAME", default_value = DEFAULT_POLICY_NAME)]
    pub config_default_name: String,

    /// Namespace holding policy config maps
    #[arg(
        long = "config-namespace",
        env = "CONFIG_DEFAULT_NAMESPACE",
        default_value = DEFAULT_NAMESPACE
    )]
    pub config_namespace: String,

    /// Name prefix of group quota config maps
    #[arg(long, env = "GROUP_PREFIX", default_value = DEFAULT_GROUP_PREFIX)]
    pub group_prefix: String,

    /// Group every caller belongs to
    #[arg(long, env = "GROUP_DEFAULT_NAME", default_value = DEFAULT_POLICY_NAME)]
    pub group_default_name: String,

    /// Namespace holding group quota config maps
    #[arg(
        long = "group-namespace",
        env = "GROUP_DEFAULT_NAMESPACE",
        default_value = DEFAULT_NAMESPACE
    )]
    pub group_namespace: String,

    /// Prefix stripped from forwarded group names
    #[arg(long, env = "GROUP_ROLE_PREFIX", default_value = DEFAULT_GROUP_ROLE_PREFIX)]
    pub group_role_prefix: String,

    /// Known groups, highest priority first
    #[arg(
        long,
        env = "KNOWN_GROUPS",
        value_delimiter = ',',
        default_values_t = DEFAULT_KNOWN_GROUPS.map(String::from)
    )]
    pub known_groups: Vec<String>,

    /// Live clusters per group when a group record omits the limit; 0 is unlimited
    #[arg(long, env = "GROUP_CLUSTER_LIMIT", default_value_t = DEFAULT_GROUP_CLUSTER_LIMIT)]
    pub group_cluster_limit: u32,

    /// Live clusters per user when a group record omits the limit
    #[arg(long, env = "USER_CLUSTER_LIMIT", default_value_t = DEFAULT_USER_CLUSTER_LIMIT)]
    pub user_cluster_limit: u32,

    /// Timeout of every policy store and backend call
    #[arg(
        long,
        env = "COLLABORATOR_TIMEOUT_SECS",
        default_value_t = DEFAULT_COLLABORATOR_TIMEOUT_SECS
    )]
    pub collaborator_timeout_secs: u64,
}

impl Settings {
    /// Quota applied when no group record is cached.
    #[must_use]
    pub fn quota_defaults(&self) -> GroupQuota {
        GroupQuota {
            group_cluster_limit: (self.group_cluster_limit > 0).then_some(self.group_cluster_limit),
            user_cluster_limit: self.user_cluster_limit,
        }
    }

    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            default_policy: self.config_default_name.clone(),
            default_group: self.group_default_name.clone(),
            known_groups: self
                .known_groups
                .iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
            group_role_prefix: self.group_role_prefix.clone(),
            quota_defaults: self.quota_defaults(),
        }
    }

    #[must_use]
    pub fn policy_location(&self) -> RecordLocation {
        RecordLocation {
            prefix: self.config_prefix.clone(),
            namespace: self.config_namespace.clone(),
        }
    }

    #[must_use]
    pub fn quota_location(&self) -> RecordLocation {
        RecordLocation {
            prefix: self.group_prefix.clone(),
            namespace: self.group_namespace.clone(),
        }
    }

    #[must_use]
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// Record names loaded at startup: the default policy, the default group
    /// and every known group.
    #[must_use]
    pub fn warm_up_names(&self) -> Vec<String> {
        let mut names = vec![self.config_default_name.clone()];
        for name in std::iter::once(&self.group_default_name).chain(&self.known_groups) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod settings_tests;
