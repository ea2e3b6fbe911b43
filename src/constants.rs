// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Beiboot gateway.
//!
//! This module contains all numeric and string defaults used throughout the
//! codebase. Constants are organized by category for easy maintenance.

// ============================================================================
// Cluster Parameter Defaults
// ============================================================================

/// Port mappings used when a request carries no `PORTS` parameter
pub const DEFAULT_PORTS: [&str; 2] = ["80:80", "443:443"];

/// Kubernetes API server port; a `6443:6443` mapping is always dropped
pub const RESERVED_API_SERVER_PORT: u16 = 6443;

/// Cluster lifetime used when a request carries no `LIFETIME` parameter
pub const DEFAULT_LIFETIME: &str = "1h";

/// Session timeout used when a request carries no `SESSION_TIMEOUT` parameter
pub const DEFAULT_SESSION_TIMEOUT: &str = "5m";

/// Seconds the backend waits for a cluster to become ready
pub const DEFAULT_CLUSTER_READY_TIMEOUT_SECS: u64 = 180;

/// Gefyra bridging is enabled unless the request disables it
pub const DEFAULT_GEFYRA_ENABLED: bool = true;

/// The connection tunnel is enabled unless the request disables it
pub const DEFAULT_TUNNEL_ENABLED: bool = true;

// ============================================================================
// Policy Defaults (used when a policy record omits a key)
// ============================================================================

/// Lowest node count any policy may allow
pub const MIN_NODE_COUNT: u32 = 1;

/// Default upper bound for `NODE_COUNT`
pub const DEFAULT_NODE_COUNT_MAX: u32 = 3;

/// Default ceiling for `LIFETIME`
pub const DEFAULT_LIFETIME_LIMIT: &str = "1d";

/// Default ceiling for `SESSION_TIMEOUT`
pub const DEFAULT_SESSION_TIMEOUT_LIMIT: &str = "1h";

// ============================================================================
// Quota Defaults
// ============================================================================

/// Live clusters allowed per group when the group record omits the key
pub const DEFAULT_GROUP_CLUSTER_LIMIT: u32 = 5;

/// Live clusters allowed per user when the group record omits the key
pub const DEFAULT_USER_CLUSTER_LIMIT: u32 = 1;

// ============================================================================
// Policy Store
// ============================================================================

/// Name prefix of policy (bounds) config maps
pub const DEFAULT_CONFIG_PREFIX: &str = "api-config-";

/// Name prefix of group (quota) config maps
pub const DEFAULT_GROUP_PREFIX: &str = "api-group-";

/// Prefix stripped from forwarded group names
pub const DEFAULT_GROUP_ROLE_PREFIX: &str = "api-group-";

/// Policy and group name used when nothing more specific applies
pub const DEFAULT_POLICY_NAME: &str = "default";

/// Namespace holding policy records and Beiboot objects
pub const DEFAULT_NAMESPACE: &str = "getdeck";

/// Known groups in priority order; the default group is always appended last
pub const DEFAULT_KNOWN_GROUPS: [&str; 2] = ["developer", "free"];

/// Timeout applied to every policy store and backend call, in seconds
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Backend
// ============================================================================

/// Cluster provider requested from the orchestration backend
pub const BEIBOOT_PROVIDER: &str = "k3s";

/// Default listen address of the operations server
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
