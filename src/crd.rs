// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The `Beiboot` custom resource.
//!
//! A `Beiboot` object is the orchestration backend's record of one ephemeral
//! cluster. The gateway creates it with the resolved parameters and reads
//! back its state; provisioning and teardown are done by the Beiboot operator.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: getdeck.dev/v1
//! kind: Beiboot
//! metadata:
//!   name: 3f0c7a52-3c1f-4a4e-9d7f-2f1c5b2a8e10
//!   namespace: getdeck
//!   labels:
//!     name: demo
//!     user: alice
//!     group: developer
//! spec:
//!   provider: k3s
//!   parameters:
//!     k8sVersion: 1.26.0
//!     ports: ["80:80", "443:443"]
//!     nodes: 2
//!     maxLifetime: 1h
//!     maxSessionTimeout: 5m
//!     clusterReadyTimeout: 180
//!     serverResources:
//!       requests:
//!         cpu: 500m
//!     gefyra:
//!       enabled: true
//!     tunnel:
//!       enabled: true
//! ```

use crate::parameters::{ClusterParameterName, RawParameter, RawValue};
use crate::policy::ResolvedParameters;
use crate::units::format_duration;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state reported by the Beiboot operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeibootState {
    #[default]
    Requested,
    Creating,
    Pending,
    Running,
    Ready,
    Error,
    Terminating,
    /// Any state this gateway does not know about yet
    #[serde(other)]
    Unknown,
}

impl fmt::Display for BeibootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BeibootState::Requested => "REQUESTED",
            BeibootState::Creating => "CREATING",
            BeibootState::Pending => "PENDING",
            BeibootState::Running => "RUNNING",
            BeibootState::Ready => "READY",
            BeibootState::Error => "ERROR",
            BeibootState::Terminating => "TERMINATING",
            BeibootState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// CPU and memory amounts, in Kubernetes quantity notation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl ResourceList {
    fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Requests and limits for the server or agent nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceList>,
}

/// An optional side service (Gefyra bridge, connection tunnel).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceToggle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Cluster parameters as the Beiboot operator consumes them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BeibootParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<String>>,

    /// Total node count, server included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub nodes: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lifetime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_session_timeout: Option<String>,

    /// Seconds to wait for the cluster to become ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_ready_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_storage_requests: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_storage_requests: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gefyra: Option<ServiceToggle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel: Option<ServiceToggle>,
}

/// `Beiboot` spec
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "getdeck.dev",
    version = "v1",
    kind = "Beiboot",
    namespaced,
    doc = "Beiboot represents one ephemeral Kubernetes cluster provisioned by the Beiboot operator."
)]
#[kube(status = "BeibootStatus")]
#[serde(rename_all = "camelCase")]
pub struct BeibootSpec {
    /// Cluster provider, e.g. `k3s`.
    pub provider: String,

    #[serde(default)]
    pub parameters: BeibootParameters,
}

/// `Beiboot` status
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BeibootStatus {
    #[serde(default)]
    pub state: BeibootState,

    /// Time after which the cluster is torn down (RFC3339 format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<String>,
}

fn resource_list(
    resolved: &ResolvedParameters,
    cpu: ClusterParameterName,
    memory: ClusterParameterName,
) -> Option<ResourceList> {
    let render = |name: ClusterParameterName| {
        let family = name.quantity_family()?;
        resolved.quantity(name).map(|q| q.to_kubernetes(family))
    };
    let list = ResourceList {
        cpu: render(cpu),
        memory: render(memory),
    };
    (!list.is_empty()).then_some(list)
}

fn requirements(
    requests: Option<ResourceList>,
    limits: Option<ResourceList>,
) -> Option<ResourceRequirements> {
    (requests.is_some() || limits.is_some()).then_some(ResourceRequirements { requests, limits })
}

impl From<&ResolvedParameters> for BeibootParameters {
    fn from(resolved: &ResolvedParameters) -> Self {
        use ClusterParameterName as P;

        let storage = |name: ClusterParameterName| {
            let family = name.quantity_family()?;
            resolved.quantity(name).map(|q| q.to_kubernetes(family))
        };

        Self {
            k8s_version: resolved.k8s_version.as_ref().map(ToString::to_string),
            ports: Some(resolved.ports.to_strings()),
            nodes: Some(resolved.node_count),
            max_lifetime: Some(format_duration(resolved.lifetime)),
            max_session_timeout: Some(format_duration(resolved.session_timeout)),
            cluster_ready_timeout: Some(resolved.cluster_ready_timeout),
            server_resources: requirements(
                resource_list(
                    resolved,
                    P::ServerResourcesRequestsCpu,
                    P::ServerResourcesRequestsMemory,
                ),
                resource_list(
                    resolved,
                    P::ServerResourcesLimitsCpu,
                    P::ServerResourcesLimitsMemory,
                ),
            ),
            node_resources: requirements(
                resource_list(
                    resolved,
                    P::NodeResourcesRequestsCpu,
                    P::NodeResourcesRequestsMemory,
                ),
                resource_list(
                    resolved,
                    P::NodeResourcesLimitsCpu,
                    P::NodeResourcesLimitsMemory,
                ),
            ),
            server_storage_requests: storage(P::ServerStorageRequests),
            node_storage_requests: storage(P::NodeStorageRequests),
            gefyra: Some(ServiceToggle {
                enabled: Some(resolved.gefyra_enabled),
                endpoint: resolved.gefyra_endpoint.clone(),
            }),
            tunnel: Some(ServiceToggle {
                enabled: Some(resolved.tunnel_enabled),
                endpoint: resolved.tunnel_endpoint.clone(),
            }),
        }
    }
}

impl BeibootParameters {
    /// Rebuild the caller-facing parameter list, in parameter order, omitting
    /// every value that is not set on the object.
    #[must_use]
    pub fn to_parameters(&self) -> Vec<RawParameter> {
        use ClusterParameterName as P;

        let text = |v: &Option<String>| v.clone().map(RawValue::Text);
        let cpu = |r: &Option<ResourceRequirements>, limits: bool| {
            r.as_ref()
                .and_then(|r| if limits { r.limits.as_ref() } else { r.requests.as_ref() })
                .and_then(|l| l.cpu.clone())
                .map(RawValue::Text)
        };
        let memory = |r: &Option<ResourceRequirements>, limits: bool| {
            r.as_ref()
                .and_then(|r| if limits { r.limits.as_ref() } else { r.requests.as_ref() })
                .and_then(|l| l.memory.clone())
                .map(RawValue::Text)
        };
        let enabled =
            |t: &Option<ServiceToggle>| t.as_ref().and_then(|t| t.enabled).map(RawValue::Bool);
        let endpoint = |t: &Option<ServiceToggle>| {
            t.as_ref()
                .and_then(|t| t.endpoint.clone())
                .map(RawValue::Text)
        };

        let values = [
            (P::K8sVersion, text(&self.k8s_version)),
            (P::Ports, self.ports.clone().map(RawValue::List)),
            (P::NodeCount, self.nodes.map(|n| RawValue::Integer(i64::from(n)))),
            (P::Lifetime, text(&self.max_lifetime)),
            (P::SessionTimeout, text(&self.max_session_timeout)),
            (
                P::ClusterReadyTimeout,
                self.cluster_ready_timeout
                    .and_then(|s| i64::try_from(s).ok())
                    .map(RawValue::Integer),
            ),
            (P::ServerResourcesRequestsCpu, cpu(&self.server_resources, false)),
            (P::ServerResourcesRequestsMemory, memory(&self.server_resources, false)),
            (P::ServerResourcesLimitsCpu, cpu(&self.server_resources, true)),
            (P::ServerResourcesLimitsMemory, memory(&self.server_resources, true)),
            (P::ServerStorageRequests, text(&self.server_storage_requests)),
            (P::NodeResourcesRequestsCpu, cpu(&self.node_resources, false)),
            (P::NodeResourcesRequestsMemory, memory(&self.node_resources, false)),
            (P::NodeResourcesLimitsCpu, cpu(&self.node_resources, true)),
            (P::NodeResourcesLimitsMemory, memory(&self.node_resources, true)),
            (P::NodeStorageRequests, text(&self.node_storage_requests)),
            (P::GefyraEnabled, enabled(&self.gefyra)),
            (P::GefyraEndpoint, endpoint(&self.gefyra)),
            (P::TunnelEnabled, enabled(&self.tunnel)),
            (P::TunnelEndpoint, endpoint(&self.tunnel)),
        ];

        values
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| RawParameter::new(name, v)))
            .collect()
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
