//! Lightweight cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds, UTC)
//! Field syntax: *, */N, N, A-B, A-B/N and comma-separated lists of those.
//! Example: "0 1 * * *" = every day at 01:00
//!
//! Day matching follows classic cron: when both DOM and DOW are restricted,
//! a day matches if either does.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use signalist_core::error::{Result, SignalistError};

/// How far ahead `next_after` searches before giving up.
const MAX_LOOKAHEAD_DAYS: i64 = 4 * 366;

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CronSchedule {
    expression: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    /// Parse a 5-field expression.
    pub fn parse(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(SignalistError::Config(format!(
                "Invalid cron expression: '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            )));
        }

        let field = |spec: &str, min: u32, max: u32, label: &str| {
            parse_field(spec, min, max).ok_or_else(|| {
                SignalistError::Config(format!(
                    "Invalid cron {label} field '{spec}' in '{expression}'"
                ))
            })
        };

        let mut days_of_week = field(parts[4], 0, 7, "day-of-week")?;
        // 7 is an alias for Sunday.
        for d in days_of_week.iter_mut() {
            if *d == 7 {
                *d = 0;
            }
        }
        days_of_week.sort_unstable();
        days_of_week.dedup();

        Ok(Self {
            expression: expression.to_string(),
            minutes: field(parts[0], 0, 59, "minute")?,
            hours: field(parts[1], 0, 23, "hour")?,
            days_of_month: field(parts[2], 1, 31, "day-of-month")?,
            months: field(parts[3], 1, 12, "month")?,
            days_of_week,
            // Any field starting with `*` (including `*/N`) leaves that day axis open.
            dom_restricted: !parts[2].starts_with('*'),
            dow_restricted: !parts[4].starts_with('*'),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First matching minute strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = (after + Duration::minutes(1))
            .with_second(0)?
            .with_nanosecond(0)?;
        let limit = after + Duration::days(MAX_LOOKAHEAD_DAYS);

        while candidate <= limit {
            if !self.months.contains(&candidate.month()) || !self.day_matches(candidate) {
                candidate = candidate
                    .date_naive()
                    .succ_opt()?
                    .and_hms_opt(0, 0, 0)?
                    .and_utc();
                continue;
            }
            if !self.hours.contains(&candidate.hour()) {
                candidate = candidate.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if !self.minutes.contains(&candidate.minute()) {
                candidate += Duration::minutes(1);
                continue;
            }
            return Some(candidate);
        }

        None
    }

    fn day_matches(&self, at: DateTime<Utc>) -> bool {
        let dom = self.days_of_month.contains(&at.day());
        let dow = self
            .days_of_week
            .contains(&at.weekday().num_days_from_sunday());
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }
}

/// Parse a cron field into a sorted list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    let mut values = Vec::new();
    for item in field.split(',') {
        values.extend(parse_item(item.trim(), min, max)?);
    }
    values.sort_unstable();
    values.dedup();
    if values.is_empty() { None } else { Some(values) }
}

fn parse_item(item: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let n: u32 = step.parse().ok()?;
            if n == 0 {
                return None;
            }
            (range, n)
        }
        None => (item, 1),
    };

    let (start, end) = if range == "*" {
        (min, max)
    } else if let Some((a, b)) = range.split_once('-') {
        (a.parse().ok()?, b.parse().ok()?)
    } else {
        let n: u32 = range.parse().ok()?;
        // "N/S" means "from N to max every S".
        if step > 1 { (n, max) } else { (n, n) }
    };

    if start < min || end > max || start > end {
        return None;
    }
    Some((start..=end).step_by(step as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn next(expression: &str, after: DateTime<Utc>) -> DateTime<Utc> {
        CronSchedule::parse(expression).unwrap().next_after(after).unwrap()
    }

    #[test]
    fn test_every_hour() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 30, 0).unwrap();
        let next = next("0 * * * *", after);
        assert_eq!(next.hour(), 11);
        assert_eq!(next.minute(), 0);
    }

    #[test]
    fn test_daily_digest_time() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 7, 0, 0).unwrap();
        let next = next("0 1 * * *", after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 23, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_exact_match_is_strictly_after() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 1, 0, 0).unwrap();
        let next = next("0 1 * * *", after);
        assert_eq!(next.day(), 23);
    }

    #[test]
    fn test_every_15_minutes() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 2, 0).unwrap();
        let next = next("*/15 * * * *", after);
        assert_eq!(next.minute(), 15);
    }

    #[test]
    fn test_weekdays_only() {
        // 2026-02-21 is a Saturday.
        let after = Utc.with_ymd_and_hms(2026, 2, 21, 12, 0, 0).unwrap();
        let next = next("30 8 * * 1-5", after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 23, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_month_and_day() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 0, 0, 0).unwrap();
        let next = next("0 0 1 6 *", after);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_list_field() {
        let schedule = CronSchedule::parse("0,30 9 * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 9, 10, 0).unwrap();
        assert_eq!(schedule.next_after(after).unwrap().minute(), 30);
    }

    #[test]
    fn test_invalid_expression() {
        assert!(CronSchedule::parse("bad").is_err());
        assert!(CronSchedule::parse("61 * * * *").is_err());
        assert!(CronSchedule::parse("*/0 * * * *").is_err());
        assert!(CronSchedule::parse("0 5-2 * * *").is_err());
    }

    #[test]
    fn test_stepped_day_of_month_is_unrestricted() {
        // After Monday 2026-02-23 the 25th is odd but not a Monday.
        let after = Utc.with_ymd_and_hms(2026, 2, 23, 1, 0, 0).unwrap();
        assert_eq!(
            next("0 0 */2 * 1", after),
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
        );
        // Both restricted: either day field matches.
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 1, 0, 0).unwrap();
        assert_eq!(
            next("0 0 25 * 1", after),
            Utc.with_ymd_and_hms(2026, 2, 23, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_impossible_date_gives_none() {
        let schedule = CronSchedule::parse("0 0 31 2 *").unwrap();
        assert!(schedule.next_after(Utc::now()).is_none());
    }
}
