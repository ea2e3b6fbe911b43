// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes-style resource quantities.
//!
//! Two suffix families are supported:
//!
//! - **Compute** - dimensionless cores (`"1"`, `"0.25"`) or millicores (`"250m"`)
//! - **Memory** - bytes with a mandatory suffix, either binary
//!   (`Ki`, `Mi`, `Gi`, `Ti`, `Pi`, `Ei`, powers of 1024) or decimal
//!   (`k`, `K`, `M`, `G`, `T`, `P`, `E`, powers of 1000)
//!
//! Values are held exactly as an integer count of nano-units (nanocores or
//! nanobytes), which is the finest precision Kubernetes itself keeps. Nothing
//! goes through floating point.

use crate::errors::UnitError;
use serde::{Serialize, Serializer};
use std::fmt;

const NANOS_PER_UNIT: u128 = 1_000_000_000;
const MILLIS_PER_UNIT: u128 = 1_000;

/// Longest mantissa accepted, in digits. Keeps every intermediate product
/// within `u128`.
const MAX_MANTISSA_DIGITS: usize = 24;

const BINARY_SUFFIXES: [(&str, u128); 6] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
];

const DECIMAL_SUFFIXES: [(&str, u128); 7] = [
    ("k", 1_000),
    ("K", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

/// Which suffix family a quantity field accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuantityFamily {
    /// CPU: cores or millicores
    Compute,
    /// Memory and storage: bytes with a binary or decimal suffix
    Memory,
}

impl QuantityFamily {
    fn expected(self) -> &'static str {
        match self {
            QuantityFamily::Compute => "cores or millicores (e.g. '0.5', '250m')",
            QuantityFamily::Memory => "a byte suffix (Ki, Mi, Gi, Ti, Pi, Ei, k, K, M, G, T, P, E)",
        }
    }
}

/// An exact, non-negative resource amount in base units (cores or bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity {
    nanos: u128,
}

impl Quantity {
    /// Construct from a whole number of base units.
    #[must_use]
    pub fn from_units(units: u64) -> Self {
        Self {
            nanos: u128::from(units) * NANOS_PER_UNIT,
        }
    }

    /// Construct from a number of thousandths of a base unit (e.g. millicores).
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self {
            nanos: u128::from(millis) * (NANOS_PER_UNIT / MILLIS_PER_UNIT),
        }
    }

    /// Exact value in billionths of a base unit.
    #[must_use]
    pub fn as_nanos(&self) -> u128 {
        self.nanos
    }

    /// Render in Kubernetes notation for `family`, using the largest suffix
    /// that keeps the value exact. The result parses back to the same value.
    #[must_use]
    pub fn to_kubernetes(&self, family: QuantityFamily) -> String {
        match family {
            QuantityFamily::Compute => {
                let nanos_per_milli = NANOS_PER_UNIT / MILLIS_PER_UNIT;
                if self.nanos % NANOS_PER_UNIT != 0 && self.nanos % nanos_per_milli == 0 {
                    format!("{}m", self.nanos / nanos_per_milli)
                } else {
                    self.to_string()
                }
            }
            QuantityFamily::Memory => {
                if self.nanos == 0 {
                    return "0Ki".to_string();
                }
                let exact = BINARY_SUFFIXES
                    .iter()
                    .chain(DECIMAL_SUFFIXES.iter().filter(|(s, _)| *s != "K"))
                    .filter(|(_, multiplier)| self.nanos % (multiplier * NANOS_PER_UNIT) == 0)
                    .max_by_key(|(_, multiplier)| *multiplier);
                if let Some((suffix, multiplier)) = exact {
                    return format!("{}{suffix}", self.nanos / (multiplier * NANOS_PER_UNIT));
                }
                // Sub-kilobyte remainder: fall back to a fractional `k` mantissa.
                let scale = 1_000 * NANOS_PER_UNIT;
                let fraction = format!("{:012}", self.nanos % scale);
                format!(
                    "{}.{}k",
                    self.nanos / scale,
                    fraction.trim_end_matches('0')
                )
            }
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.nanos / NANOS_PER_UNIT;
        let fraction = self.nanos % NANOS_PER_UNIT;
        if fraction == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{fraction:09}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a quantity string for the given family.
///
/// # Examples
///
/// ```
/// use beiboot_gateway::units::quantity::{parse_quantity, Quantity, QuantityFamily};
///
/// let one_gi = parse_quantity("1Gi", QuantityFamily::Memory).unwrap();
/// assert_eq!(one_gi, Quantity::from_units(1_073_741_824));
///
/// let quarter = parse_quantity("250m", QuantityFamily::Compute).unwrap();
/// assert_eq!(quarter.to_string(), "0.25");
///
/// assert!(parse_quantity("1Gi", QuantityFamily::Compute).is_err());
/// assert!(parse_quantity("1", QuantityFamily::Memory).is_err());
/// ```
///
/// # Errors
///
/// - [`UnitError::InvalidUnit`] if a compute value ends in a memory suffix, or a
///   memory value does not end in a recognized suffix
/// - [`UnitError::InvalidFormat`] if the mantissa is not a plain decimal number,
///   is too large, or is more precise than one nano-unit
pub fn parse_quantity(value: &str, family: QuantityFamily) -> Result<Quantity, UnitError> {
    let suffix = memory_suffix(value);

    match family {
        QuantityFamily::Compute => {
            if suffix.is_some() {
                return Err(UnitError::InvalidUnit {
                    value: value.to_string(),
                    expected: family.expected(),
                });
            }
            match value.strip_suffix('m') {
                Some(mantissa) => scale_mantissa(value, mantissa, 1, MILLIS_PER_UNIT),
                None => scale_mantissa(value, value, 1, 1),
            }
        }
        QuantityFamily::Memory => {
            let Some((suffix, multiplier)) = suffix else {
                return Err(UnitError::InvalidUnit {
                    value: value.to_string(),
                    expected: family.expected(),
                });
            };
            let mantissa = &value[..value.len() - suffix.len()];
            scale_mantissa(value, mantissa, multiplier, 1)
        }
    }
}

fn memory_suffix(value: &str) -> Option<(&'static str, u128)> {
    BINARY_SUFFIXES
        .iter()
        .chain(DECIMAL_SUFFIXES.iter())
        .find(|(suffix, _)| value.ends_with(suffix))
        .copied()
}

/// Compute `mantissa * multiplier / divisor` exactly, in nano-units.
fn scale_mantissa(
    raw: &str,
    mantissa: &str,
    multiplier: u128,
    divisor: u128,
) -> Result<Quantity, UnitError> {
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty())
        || !digits_only(whole)
        || !digits_only(fraction)
    {
        return Err(UnitError::format(raw, "quantity must be a plain decimal number"));
    }
    if whole.len() + fraction.len() > MAX_MANTISSA_DIGITS {
        return Err(UnitError::format(raw, "quantity too large"));
    }

    let too_large = || UnitError::format(raw, "quantity too large");
    let combined: u128 = format!("{whole}{fraction}")
        .parse()
        .map_err(|_| too_large())?;
    let fraction_digits = u32::try_from(fraction.len()).map_err(|_| too_large())?;

    let numerator = combined
        .checked_mul(multiplier)
        .and_then(|n| n.checked_mul(NANOS_PER_UNIT))
        .ok_or_else(too_large)?;
    let denominator = 10u128
        .checked_pow(fraction_digits)
        .and_then(|d| d.checked_mul(divisor))
        .ok_or_else(too_large)?;

    if numerator % denominator != 0 {
        return Err(UnitError::format(
            raw,
            "quantity is more precise than one billionth of a unit",
        ));
    }

    Ok(Quantity {
        nanos: numerator / denominator,
    })
}

#[cfg(test)]
#[path = "quantity_tests.rs"]
mod quantity_tests;
