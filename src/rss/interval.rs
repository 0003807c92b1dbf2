//! Poll interval parsing.
//!
//! Intervals are written as a sequence of decimal numbers, each with an
//! optional fraction and a unit suffix, such as `"30s"`, `"1.5m"` or
//! `"1h30m"`. Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`.

use std::time::Duration;

use crate::{GatorError, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a poll interval, which must be strictly positive.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix('-') {
        return match parse_duration(rest) {
            Ok(_) => Err(non_positive(s)),
            Err(msg) => Err(invalid(s, &msg)),
        };
    }

    let unsigned = s.strip_prefix('+').unwrap_or(s);
    let duration = parse_duration(unsigned).map_err(|msg| invalid(s, &msg))?;
    if duration.is_zero() {
        return Err(non_positive(s));
    }
    Ok(duration)
}

fn invalid(s: &str, msg: &str) -> GatorError {
    GatorError::Validation(format!("invalid interval {s:?}: {msg}"))
}

fn non_positive(s: &str) -> GatorError {
    GatorError::Validation(format!("interval {s:?} must be positive"))
}

/// Parse an unsigned duration string.
fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        if unit.is_empty() {
            return Err("missing unit".to_string());
        }
        let unit_nanos = unit_nanos(unit).ok_or_else(|| format!("unknown unit {unit:?}"))?;
        let nanos = component_nanos(number, unit_nanos)?;

        total = total
            .checked_add(nanos)
            .ok_or_else(|| "duration out of range".to_string())?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| "duration out of range")?;
    // Remainder is always below one second.
    let subsec = (total % NANOS_PER_SEC) as u32;
    Ok(Duration::new(secs, subsec))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Convert one `<number><unit>` component to nanoseconds.
fn component_nanos(number: &str, unit_nanos: u128) -> std::result::Result<u128, String> {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err("missing number".to_string());
    }
    if frac_part.contains('.') {
        return Err(format!("malformed number {number:?}"));
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| format!("malformed number {number:?}"))?
    };

    let mut nanos = int_value
        .checked_mul(unit_nanos)
        .ok_or_else(|| "duration out of range".to_string())?;

    // Digits beyond nanosecond precision cannot contribute.
    let frac_digits = &frac_part[..frac_part.len().min(18)];
    if !frac_digits.is_empty() {
        let frac_value: u128 = frac_digits
            .parse()
            .map_err(|_| format!("malformed number {number:?}"))?;
        let scale = 10u128.pow(frac_digits.len() as u32);
        nanos += frac_value * unit_nanos / scale;
    }

    Ok(nanos)
}
