// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Administrator policy: records, resolution, caching and storage.
//!
//! - [`record`] - [`PolicyRecord`] and its store key format
//! - [`resolver`] - [`resolve`], merging a policy with a request
//! - [`cache`] - [`PolicyCache`], the process-wide record cache
//! - [`store`] - [`PolicyStore`] and its Kubernetes implementation

pub mod cache;
pub mod record;
pub mod resolver;
pub mod store;

pub use cache::PolicyCache;
pub use record::{PolicyRecord, QuantityBounds};
pub use resolver::{resolve, ResolvedParameters};
pub use store::{KubePolicyStore, PolicyStore, RecordKind, RecordLocation};
