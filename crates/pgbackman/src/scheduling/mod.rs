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

//! Five-field cron schedules for recurring backup definitions.
//!
//! Minute and hour fields get strict range validation because the admin API
//! may substitute pseudo-random values drawn from a configured interval to
//! spread load across a node. The assembled expression is additionally
//! validated with [`croner`] so that day-of-month, month and weekday fields
//! reject anything the local cron would reject.

use std::fmt;

use croner::Cron;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A five-field cron schedule (minute, hour, day-of-month, month, weekday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    pub minutes: String,
    pub hours: String,
    pub day_month: String,
    pub month: String,
    pub weekday: String,
}

impl CronSchedule {
    /// Validates and assembles a schedule from its five fields.
    pub fn parse(
        minutes: &str,
        hours: &str,
        day_month: &str,
        month: &str,
        weekday: &str,
    ) -> Result<Self, ValidationError> {
        validate_range_field("minute", minutes, 59)?;
        validate_range_field("hour", hours, 23)?;

        let schedule = CronSchedule {
            minutes: minutes.trim().to_string(),
            hours: hours.trim().to_string(),
            day_month: day_month.trim().to_string(),
            month: month.trim().to_string(),
            weekday: weekday.trim().to_string(),
        };

        // croner catches malformed day-of-month / month / weekday fields.
        Cron::new(&schedule.expression())
            .parse()
            .map_err(|e| ValidationError::CronField {
                field: "schedule",
                value: schedule.expression(),
                reason: e.to_string(),
            })?;

        Ok(schedule)
    }

    /// The five fields joined into a single cron expression.
    pub fn expression(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.minutes, self.hours, self.day_month, self.month, self.weekday
        )
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

/// Validates a minute/hour cron field: `*`, a number, a range `a-b` with
/// `a <= b`, a step `*/n`, or a comma list of numbers and ranges, all within
/// `0..=max`.
fn validate_range_field(
    field: &'static str,
    value: &str,
    max: u32,
) -> Result<(), ValidationError> {
    let value = value.trim();

    let err = |reason: String| ValidationError::CronField {
        field,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(err("field is empty".to_string()));
    }

    if value == "*" {
        return Ok(());
    }

    if let Some(step) = value.strip_prefix("*/") {
        let n: u32 = step
            .parse()
            .map_err(|_| err(format!("invalid step '{}'", step)))?;
        if n == 0 || n > max {
            return Err(err(format!("step must be between 1 and {}", max)));
        }
        return Ok(());
    }

    for part in value.split(',') {
        match part.split_once('-') {
            Some((a, b)) => {
                let a: u32 = a
                    .parse()
                    .map_err(|_| err(format!("invalid number '{}'", a)))?;
                let b: u32 = b
                    .parse()
                    .map_err(|_| err(format!("invalid number '{}'", b)))?;
                if a > b {
                    return Err(err(format!("range {}-{} is inverted", a, b)));
                }
                if b > max {
                    return Err(err(format!("value {} exceeds maximum {}", b, max)));
                }
            }
            None => {
                let n: u32 = part
                    .parse()
                    .map_err(|_| err(format!("invalid number '{}'", part)))?;
                if n > max {
                    return Err(err(format!("value {} exceeds maximum {}", n, max)));
                }
            }
        }
    }

    Ok(())
}

/// Draws a pseudo-random value from an `a-b` interval specification.
///
/// Used to spread the minute and hour of bulk-registered definitions across
/// the node's configured backup window.
pub fn random_in_interval(spec: &str, max: u32, rng: &mut impl Rng) -> Result<u32, ValidationError> {
    let err = || ValidationError::Interval(spec.to_string());

    let (a, b) = spec.trim().split_once('-').ok_or_else(err)?;
    let a: u32 = a.trim().parse().map_err(|_| err())?;
    let b: u32 = b.trim().parse().map_err(|_| err())?;

    if a > b || b > max {
        return Err(err());
    }

    Ok(rng.gen_range(a..=b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn accepts_plain_fields() {
        let s = CronSchedule::parse("30", "02", "*", "*", "*").unwrap();
        assert_eq!(s.expression(), "30 02 * * *");
    }

    #[test]
    fn accepts_ranges_lists_and_steps() {
        assert!(CronSchedule::parse("0-15", "8-18", "*", "*", "1-5").is_ok());
        assert!(CronSchedule::parse("0,15,30,45", "*/2", "1", "*", "*").is_ok());
    }

    #[test]
    fn rejects_out_of_range_minute() {
        let e = CronSchedule::parse("61", "02", "*", "*", "*").unwrap_err();
        assert!(matches!(e, ValidationError::CronField { field: "minute", .. }));
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(CronSchedule::parse("30-10", "02", "*", "*", "*").is_err());
        assert!(CronSchedule::parse("10", "23-8", "*", "*", "*").is_err());
    }

    #[test]
    fn rejects_hour_above_23() {
        assert!(CronSchedule::parse("0", "24", "*", "*", "*").is_err());
    }

    #[test]
    fn random_draw_stays_in_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let v = random_in_interval("01-59", 59, &mut rng).unwrap();
            assert!((1..=59).contains(&v));
        }
    }

    #[test]
    fn random_draw_rejects_bad_specs() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(random_in_interval("59-1", 59, &mut rng).is_err());
        assert!(random_in_interval("0-99", 59, &mut rng).is_err());
        assert!(random_in_interval("all", 59, &mut rng).is_err());
    }
}
