//! Size and date literal parsing for inferred filters.

use chrono::{DateTime, NaiveDate, Utc};

/// Parse a size literal such as `10mb` or `1.5 GB` (already split).
///
/// `number` may carry its unit (`10mb`); otherwise `unit` is consulted.
/// A number without a size unit is not a size (`over 65`, `over 3 years`).
/// Returns the size in bytes and whether `unit` was consumed.
pub fn parse_size(number: &str, unit: Option<&str>) -> Option<(u64, bool)> {
    let number = number.trim().to_ascii_lowercase();
    let split = number
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(number.len());
    let (digits, attached) = number.split_at(split);
    if digits.is_empty() || digits.starts_with('.') {
        return None;
    }
    let value: f64 = digits.parse().ok()?;

    let (multiplier, consumed) = if !attached.is_empty() {
        (unit_multiplier(attached)?, false)
    } else {
        (unit_multiplier(&unit?.to_ascii_lowercase())?, true)
    };

    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return None;
    }
    Some((bytes.round() as u64, consumed))
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let unit = unit.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    match unit {
        "b" | "byte" | "bytes" => Some(1),
        "k" | "kb" | "kib" => Some(1 << 10),
        "m" | "mb" | "mib" => Some(1 << 20),
        "g" | "gb" | "gib" => Some(1 << 30),
        "t" | "tb" | "tib" => Some(1 << 40),
        _ => None,
    }
}

/// Which end of a date range a literal is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// First instant the phrase refers to (`since 2023` → 2023-01-01).
    Start,
    /// First instant after the phrase (`after 2023` → 2024-01-01).
    End,
}

/// Parse `YYYY-MM-DD` or a bare `YYYY` into a UTC instant.
pub fn parse_date(token: &str, bound: DateBound) -> Option<DateTime<Utc>> {
    let token = token.trim();
    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        let date = match bound {
            DateBound::Start => date,
            DateBound::End => date.succ_opt()?,
        };
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = token.parse().ok()?;
        if !(1900..=2100).contains(&year) {
            return None;
        }
        let year = match bound {
            DateBound::Start => year,
            DateBound::End => year + 1,
        };
        return Some(NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}
