// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Duration parsing for compact `1d2h3m4s` style strings.
//!
//! Cluster lifetimes and session timeouts are submitted as compact duration
//! strings. Every component is optional but they must appear in the order
//! days, hours, minutes, seconds. Components may be negative and unit letters
//! are case-insensitive, so `1D-30m` is valid and means 23h30m.

use crate::errors::UnitError;
use chrono::TimeDelta;
use regex::Regex;
use std::sync::LazyLock;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_DAY: i64 = 86400;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(-?\d+)d)?(?:(-?\d+)h)?(?:(-?\d+)m)?(?:(-?\d+)s)?$")
        .expect("duration pattern is a valid regex")
});

/// Parse a compact duration string into an exact signed duration.
///
/// # Examples
///
/// ```
/// use beiboot_gateway::units::duration::parse_duration;
/// use chrono::TimeDelta;
///
/// assert_eq!(parse_duration("1d2h3m4s").unwrap(), TimeDelta::seconds(93_784));
/// assert_eq!(parse_duration("5m").unwrap(), TimeDelta::minutes(5));
///
/// assert!(parse_duration("").is_err());
/// assert!(parse_duration("10").is_err()); // Missing unit
/// assert!(parse_duration("0h").is_err()); // Zero duration
/// ```
///
/// # Errors
///
/// Returns [`UnitError::InvalidFormat`] if the string does not match the pattern,
/// has no component at all, overflows, or composes to a zero duration.
pub fn parse_duration(value: &str) -> Result<TimeDelta, UnitError> {
    let captures = DURATION_PATTERN.captures(value).ok_or_else(|| {
        UnitError::format(value, "Please use the format '1d2h3m4s'")
    })?;

    let factors = [SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, 1];
    let mut total: i64 = 0;
    let mut components = 0;

    for (index, factor) in factors.iter().enumerate() {
        let Some(component) = captures.get(index + 1) else {
            continue;
        };
        components += 1;

        let amount: i64 = component
            .as_str()
            .parse()
            .map_err(|_| UnitError::format(value, "duration component too large"))?;

        total = amount
            .checked_mul(*factor)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(|| UnitError::format(value, "duration too large (overflow)"))?;
    }

    if components == 0 {
        return Err(UnitError::format(
            value,
            "duration must contain at least one of d, h, m, s",
        ));
    }

    if total == 0 {
        return Err(UnitError::format(value, "duration must not be zero"));
    }

    TimeDelta::try_seconds(total)
        .ok_or_else(|| UnitError::format(value, "duration too large (overflow)"))
}

/// Render a duration back into canonical compact form (e.g. `1d2h3m4s`).
///
/// Zero components are omitted; a zero duration renders as `0s`.
#[must_use]
pub fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds();
    if total == 0 {
        return "0s".to_string();
    }

    let mut rendered = String::new();
    if total < 0 {
        rendered.push('-');
    }

    let mut remaining = total.unsigned_abs();
    for (factor, unit) in [
        (SECONDS_PER_DAY.unsigned_abs(), 'd'),
        (SECONDS_PER_HOUR.unsigned_abs(), 'h'),
        (SECONDS_PER_MINUTE.unsigned_abs(), 'm'),
        (1, 's'),
    ] {
        let amount = remaining / factor;
        remaining %= factor;
        if amount > 0 {
            rendered.push_str(&amount.to_string());
            rendered.push(unit);
        }
    }

    rendered
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod duration_tests;
