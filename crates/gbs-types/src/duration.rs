//! Parsing of lookback durations such as `90s`, `15m` or `1h30m`.
//!
//! A duration is a sequence of decimal numbers, each followed by a unit:
//! `ms`, `s`, `m`, `h` or `d`. Fractions are allowed (`1.5h`).

use std::time::Duration;

use crate::error::{TypeError, TypeResult};

fn unit_nanos(unit: &str) -> Option<f64> {
    match unit {
        "ms" => Some(1e6),
        "s" => Some(1e9),
        "m" => Some(60.0 * 1e9),
        "h" => Some(3600.0 * 1e9),
        "d" => Some(86_400.0 * 1e9),
        _ => None,
    }
}

/// Parse a duration string.
///
/// ```
/// use std::time::Duration;
/// use gbs_types::parse_duration;
///
/// assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert!(parse_duration("soon").is_err());
/// ```
pub fn parse_duration(input: &str) -> TypeResult<Duration> {
    let err = |reason: &str| TypeError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(err("empty duration"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(err("expected a number"));
        }
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| err("malformed number"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(err("missing unit"));
        }
        let factor = unit_nanos(&rest[..unit_len]).ok_or_else(|| err("unknown unit"))?;
        rest = &rest[unit_len..];

        total_nanos += value * factor;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(err("duration out of range"));
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Render a duration in the compact form accepted by [`parse_duration`],
/// truncated to whole seconds, e.g. `1h30m` or `45s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return "0s".into();
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}
