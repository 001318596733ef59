/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Input validation helpers for the admin API boundary.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::ValidationError;

/// pg_dump releases the executor knows how to resolve to a binary
/// directory. An empty selector means "use the source cluster's version".
pub const PG_DUMP_RELEASES: [&str; 9] = ["9.6", "10", "11", "12", "13", "14", "15", "16", "17"];

/// Parses a pg_dump release selector. Empty input means "source cluster's
/// version" and yields `None`.
pub fn parse_pg_dump_release(raw: &str) -> Result<Option<String>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    if PG_DUMP_RELEASES.contains(&raw) {
        Ok(Some(raw.to_string()))
    } else {
        Err(ValidationError::PgDumpRelease(raw.to_string()))
    }
}

/// Parses a Postgres-style interval string ("7 days", "2 weeks", "1 month")
/// into a duration. Months and years use the calendar approximations the
/// retention comparisons tolerate (30 / 365 days).
pub fn parse_interval(raw: &str) -> Result<Duration, ValidationError> {
    let err = || ValidationError::Interval(raw.to_string());

    let mut parts = raw.trim().split_whitespace();
    let amount: i64 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let unit = parts.next().ok_or_else(err)?.to_lowercase();

    if parts.next().is_some() || amount < 0 {
        return Err(err());
    }

    let duration = match unit.trim_end_matches('s') {
        "min" | "minute" => Duration::minutes(amount),
        "hour" => Duration::hours(amount),
        "day" => Duration::days(amount),
        "week" => Duration::weeks(amount),
        "month" => Duration::days(amount * 30),
        "year" => Duration::days(amount * 365),
        _ => return Err(err()),
    };

    Ok(duration)
}

/// Parses an AT timestamp: RFC3339 or `YYYY-MM-DD HH:MM[:SS]` local to UTC.
pub fn parse_at_time(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(ValidationError::Timestamp(raw.to_string()))
}

/// Parses a retention redundancy count (>= 0).
pub fn parse_redundancy(raw: &str) -> Result<i32, ValidationError> {
    let value: i32 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::Invalid(format!("invalid retention redundancy '{}'", raw)))?;

    if value < 0 {
        return Err(ValidationError::Invalid(format!(
            "retention redundancy must not be negative, got {}",
            value
        )));
    }

    Ok(value)
}

/// Returns the input or, when it is empty, the stored default. Used to
/// implement "empty string means use the node/server default" inside the
/// API rather than in the shell.
pub fn or_default<'a>(raw: &'a str, default: &'a str) -> &'a str {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_units() {
        assert_eq!(parse_interval("7 days").unwrap(), Duration::days(7));
        assert_eq!(parse_interval("1 day").unwrap(), Duration::days(1));
        assert_eq!(parse_interval("2 weeks").unwrap(), Duration::weeks(2));
        assert_eq!(parse_interval("3 hours").unwrap(), Duration::hours(3));
        assert_eq!(parse_interval("1 month").unwrap(), Duration::days(30));
        assert_eq!(parse_interval("2 years").unwrap(), Duration::days(730));
    }

    #[test]
    fn interval_rejects_garbage() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("days").is_err());
        assert!(parse_interval("7 fortnights").is_err());
        assert!(parse_interval("-1 days").is_err());
        assert!(parse_interval("7 days extra").is_err());
    }

    #[test]
    fn pg_dump_release_selector() {
        assert_eq!(parse_pg_dump_release("").unwrap(), None);
        assert_eq!(parse_pg_dump_release("none").unwrap(), None);
        assert_eq!(parse_pg_dump_release("16").unwrap(), Some("16".to_string()));
        assert!(parse_pg_dump_release("8.4").is_err());
    }

    #[test]
    fn at_time_formats() {
        assert!(parse_at_time("2024-06-01 03:30:00").is_ok());
        assert!(parse_at_time("2024-06-01 03:30").is_ok());
        assert!(parse_at_time("2024-06-01T03:30:00Z").is_ok());
        assert!(parse_at_time("tomorrow").is_err());
    }

    #[test]
    fn redundancy_bounds() {
        assert_eq!(parse_redundancy("2").unwrap(), 2);
        assert_eq!(parse_redundancy("0").unwrap(), 0);
        assert!(parse_redundancy("-1").is_err());
        assert!(parse_redundancy("two").is_err());
    }

    #[test]
    fn empty_input_takes_default() {
        assert_eq!(or_default("", "FULL"), "FULL");
        assert_eq!(or_default("  ", "FULL"), "FULL");
        assert_eq!(or_default("SCHEMA", "FULL"), "SCHEMA");
    }
}
