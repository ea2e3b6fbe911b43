// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Beiboot Gateway - Parameter Resolution and Quota Admission
//!
//! The Beiboot gateway sits between users and the Beiboot operator, which
//! provisions short-lived Kubernetes clusters. Before a cluster is submitted
//! the gateway validates every requested parameter, resolves it against the
//! administrator policy of the caller's group and checks the group and user
//! live-cluster quotas.
//!
//! ## Modules
//!
//! - [`units`] - Duration, quantity, version and port-mapping parsers
//! - [`parameters`] - Named cluster parameters and their validators
//! - [`policy`] - Policy records, bounds resolution, the policy cache and store
//! - [`quota`] - Group selection and quota admission
//! - [`labels`] - Scoping labels of Beiboot objects
//! - [`crd`] - The `Beiboot` custom resource
//! - [`backend`] - The orchestration backend
//! - [`gateway`] - Every caller-facing operation
//! - [`settings`] - Process configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust
//! use beiboot_gateway::parameters::{
//!     ClusterParameterName, ParameterCollection, RawParameter, RawValue,
//! };
//! use beiboot_gateway::policy::{resolve, PolicyRecord};
//!
//! let request = vec![
//!     RawParameter::new(ClusterParameterName::NodeCount, RawValue::Integer(2)),
//!     RawParameter::new(
//!         ClusterParameterName::Lifetime,
//!         RawValue::Text("2h".to_string()),
//!     ),
//! ];
//!
//! let parameters = ParameterCollection::from_raw(request).unwrap();
//! let resolved = resolve(&PolicyRecord::default(), &parameters).unwrap();
//! assert_eq!(resolved.node_count, 2);
//! ```

pub mod backend;
pub mod constants;
pub mod crd;
pub mod errors;
pub mod gateway;
pub mod labels;
pub mod metrics;
pub mod parameters;
pub mod policy;
pub mod quota;
pub mod settings;
pub mod units;
