// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Parsers for unit-bearing textual values.
//!
//! All parsers are pure functions that convert caller- or administrator-supplied
//! strings into exact values, failing with a [`crate::errors::UnitError`]:
//!
//! - [`duration`] - `1d2h3m4s` style durations
//! - [`quantity`] - Kubernetes resource quantities (compute and memory families)
//! - [`version`] - strict semantic versions
//! - [`ports`] - `local:cluster` port mappings

pub mod duration;
pub mod ports;
pub mod quantity;
pub mod version;

pub use duration::{format_duration, parse_duration};
pub use ports::{PortMapping, PortMappings};
pub use quantity::{parse_quantity, Quantity, QuantityFamily};
pub use version::parse_version;
