//! Time expressions for `since`, `until`, and `before`

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use crate::error::{LogError, LogResult};

static RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([mhd])$").expect("valid relative time pattern"));

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Resolve a time expression against `now`
///
/// Accepted forms:
/// - relative `<n>m`, `<n>h`, `<n>d` (minutes, hours, days before `now`)
/// - `today` / `yesterday` (UTC midnight)
/// - RFC 3339 timestamps
/// - `YYYY-MM-DD` (UTC midnight) and naive date-times, read as UTC
pub fn parse_time_expr(expr: &str, now: DateTime<Utc>) -> LogResult<DateTime<Utc>> {
    let input = expr.trim();
    let invalid = || LogError::InvalidTimeExpression(expr.to_string());

    if let Some(caps) = RELATIVE.captures(input) {
        let amount: i64 = caps[1].parse().map_err(|_| invalid())?;
        let delta = match &caps[2] {
            "m" => Duration::try_minutes(amount),
            "h" => Duration::try_hours(amount),
            _ => Duration::try_days(amount),
        }
        .ok_or_else(invalid)?;
        return now.checked_sub_signed(delta).ok_or_else(invalid);
    }

    match input.to_lowercase().as_str() {
        "today" => return Ok(start_of_day(now.date_naive())),
        "yesterday" => {
            let day = now.date_naive().pred_opt().ok_or_else(invalid)?;
            return Ok(start_of_day(day));
        }
        _ => {}
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(invalid)
}

/// Parse an optional expression, resolving against the current time
pub fn parse_optional(expr: Option<&str>, now: DateTime<Utc>) -> LogResult<Option<DateTime<Utc>>> {
    expr.map(|e| parse_time_expr(e, now)).transpose()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
