//! Parsers for the composite time formats accepted in request fields.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

pub const SEC_PER_MIN: i64 = 60;
pub const SEC_PER_HOUR: i64 = 3600;
pub const SEC_PER_DAY: i64 = 86_400;
pub const SEC_PER_WEEK: i64 = 7 * SEC_PER_DAY;

// ---------------------------------------------------------------------------
// Time units
// ---------------------------------------------------------------------------

fn time_unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([smhdw]?)$").expect("valid regex"))
}

/// Parse `30s`, `5m`, `1h`, `1d` or `1w` into seconds. A bare number is
/// seconds.
pub fn parse_time_unit(s: &str) -> Result<i64, String> {
    let invalid = || "a time unit is expected".to_string();
    let caps = time_unit_re().captures(s.trim()).ok_or_else(invalid)?;
    let amount: i64 = caps[1].parse().map_err(|_| invalid())?;
    let factor = match &caps[2] {
        "" | "s" => 1,
        "m" => SEC_PER_MIN,
        "h" => SEC_PER_HOUR,
        "d" => SEC_PER_DAY,
        "w" => SEC_PER_WEEK,
        _ => return Err(invalid()),
    };
    amount.checked_mul(factor).ok_or_else(invalid)
}

// ---------------------------------------------------------------------------
// Time periods
// ---------------------------------------------------------------------------

/// One `d[-d],hh:mm-hh:mm` period. Times are minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimePeriod {
    pub day_from: u8,
    pub day_to: u8,
    pub start: u16,
    pub end: u16,
}

fn time_period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([1-7])(?:-([1-7]))?,(\d{1,2}):(\d{2})-(\d{1,2}):(\d{2})$")
            .expect("valid regex")
    })
}

/// Parse a `;`-separated list of time periods such as `1-5,09:00-18:00;6-7,10:00-14:00`.
pub fn parse_time_periods(s: &str) -> Result<Vec<TimePeriod>, String> {
    let invalid = || "a time period is expected".to_string();
    let trimmed = s.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut periods = Vec::new();
    for part in trimmed.split(';') {
        let caps = time_period_re().captures(part.trim()).ok_or_else(invalid)?;
        let day_from: u8 = caps[1].parse().map_err(|_| invalid())?;
        let day_to: u8 = match caps.get(2) {
            Some(m) => m.as_str().parse().map_err(|_| invalid())?,
            None => day_from,
        };
        let start = clock_minutes(&caps[3], &caps[4]).ok_or_else(invalid)?;
        let end = clock_minutes(&caps[5], &caps[6]).ok_or_else(invalid)?;

        if day_from > day_to || start >= end || start >= 24 * 60 {
            return Err(invalid());
        }
        periods.push(TimePeriod {
            day_from,
            day_to,
            start,
            end,
        });
    }
    Ok(periods)
}

/// `hh`, `mm` → minutes since midnight; `24:00` is the only valid hour-24 value.
fn clock_minutes(hours: &str, minutes: &str) -> Option<u16> {
    let h: u16 = hours.parse().ok()?;
    let m: u16 = minutes.parse().ok()?;
    if m > 59 || h > 24 || (h == 24 && m != 0) {
        return None;
    }
    Some(h * 60 + m)
}

// ---------------------------------------------------------------------------
// Absolute time
// ---------------------------------------------------------------------------

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD hh:mm` or `YYYY-MM-DD hh:mm:ss`.
pub fn parse_abs_time(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err("a time is expected".to_string())
}
