// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cron expression parsing and next-occurrence calculation.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;

use crate::error::{JobError, Result};

fn invalid(expression: &str, message: impl Into<String>) -> JobError {
	JobError::InvalidCronExpression {
		expression: expression.to_string(),
		message: message.into(),
	}
}

/// Rewrites a Unix day-of-week field (0 or 7 = Sunday) into the `cron`
/// crate's numbering (1 = Sunday). Names and `*` steps carry over unchanged.
fn to_cron_crate_weekdays(field: &str, expression: &str) -> Result<String> {
	let parse_day = |value: &str| -> Result<u32> {
		match value.parse::<u32>() {
			Ok(day) if day <= 7 => Ok(day),
			_ => Err(invalid(expression, format!("invalid day of week '{value}'"))),
		}
	};

	let mut items = Vec::new();
	for item in field.split(',') {
		let (range, step) = match item.split_once('/') {
			Some((range, step)) => (range, Some(step)),
			None => (item, None),
		};
		let starts_numeric = range.chars().next().is_some_and(|c| c.is_ascii_digit());
		if !starts_numeric {
			items.push(item.to_string());
			continue;
		}

		let (start, end) = match range.split_once('-') {
			Some((start, end)) => (parse_day(start)?, parse_day(end)?),
			None if step.is_some() => (parse_day(range)?, 6),
			None => {
				let day = parse_day(range)?;
				items.push((day % 7 + 1).to_string());
				continue;
			}
		};
		let step = match step {
			Some(step) => step
				.parse::<usize>()
				.ok()
				.filter(|s| *s > 0)
				.ok_or_else(|| invalid(expression, format!("invalid step '{step}'")))?,
			None => 1,
		};
		if start > end {
			return Err(invalid(expression, format!("invalid day range '{range}'")));
		}

		let mut days: Vec<u32> = (start..=end).step_by(step).map(|d| d % 7 + 1).collect();
		days.sort_unstable();
		days.dedup();
		items.extend(days.iter().map(u32::to_string));
	}
	Ok(items.join(","))
}

/// Normalises a 5-field (minute precision) or 6-field (second precision)
/// expression into the 6-field form the `cron` crate parses.
///
/// Five-field expressions use Unix day-of-week numbering; six-field ones are
/// taken in the `cron` crate's own syntax.
fn to_cron_crate_format(expression: &str) -> Result<String> {
	let fields: Vec<&str> = expression.split_whitespace().collect();
	match fields.len() {
		5 => {
			let weekdays = to_cron_crate_weekdays(fields[4], expression)?;
			Ok(format!("0 {} {}", fields[..4].join(" "), weekdays))
		}
		6 => Ok(fields.join(" ")),
		n => Err(invalid(expression, format!("expected 5 or 6 fields, found {n}"))),
	}
}

/// A parsed cron schedule, keeping the expression it came from for logging.
#[derive(Debug, Clone)]
pub struct CronSchedule {
	expression: String,
	schedule: Schedule,
}

impl CronSchedule {
	pub fn parse(expression: &str) -> Result<Self> {
		let normalized = to_cron_crate_format(expression)?;
		let schedule =
			Schedule::from_str(&normalized).map_err(|e| JobError::InvalidCronExpression {
				expression: expression.to_string(),
				message: e.to_string(),
			})?;
		Ok(Self {
			expression: expression.trim().to_string(),
			schedule,
		})
	}

	pub fn expression(&self) -> &str {
		&self.expression
	}

	/// The first occurrence strictly after `after`, evaluated in `timezone`.
	pub fn next_after(&self, after: DateTime<Utc>, timezone: Tz) -> Option<DateTime<Utc>> {
		let local_after = after.with_timezone(&timezone);
		self
			.schedule
			.after(&local_after)
			.next()
			.map(|next| next.with_timezone(&Utc))
	}
}

pub fn validate_cron_expression(expression: &str) -> Result<()> {
	CronSchedule::parse(expression).map(|_| ())
}

pub fn parse_timezone(timezone: &str) -> Result<Tz> {
	timezone
		.parse()
		.map_err(|_| JobError::InvalidTimezone(timezone.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Datelike, TimeZone, Timelike, Weekday};

	#[test]
	fn test_five_field_expression_fires_on_the_minute() {
		let schedule = CronSchedule::parse("*/15 * * * *").unwrap();
		let after = Utc.with_ymd_and_hms(2025, 3, 1, 10, 7, 42).unwrap();
		let next = schedule.next_after(after, Tz::UTC).unwrap();
		assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap());
	}

	#[test]
	fn test_six_field_expression_keeps_seconds() {
		let schedule = CronSchedule::parse("30 * * * * *").unwrap();
		let after = Utc.with_ymd_and_hms(2025, 3, 1, 10, 7, 42).unwrap();
		let next = schedule.next_after(after, Tz::UTC).unwrap();
		assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 10, 8, 30).unwrap());
	}

	#[test]
	fn test_next_is_strictly_after() {
		let schedule = CronSchedule::parse("0 * * * *").unwrap();
		let on_the_hour = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
		let next = schedule.next_after(on_the_hour, Tz::UTC).unwrap();
		assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap());
	}

	#[test]
	fn test_timezone_shifts_occurrence() {
		// 09:00 in Moscow (UTC+3) is 06:00 UTC.
		let schedule = CronSchedule::parse("0 9 * * *").unwrap();
		let tz = parse_timezone("Europe/Moscow").unwrap();
		let after = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
		let next = schedule.next_after(after, tz).unwrap();
		assert_eq!(next.hour(), 6);
		assert_eq!(next.minute(), 0);
	}

	#[test]
	fn test_rejects_wrong_field_counts() {
		for expr in ["", "* * * *", "0 0 * * * * 2030", "every minute"] {
			let err = CronSchedule::parse(expr).unwrap_err();
			assert!(
				matches!(err, JobError::InvalidCronExpression { .. }),
				"expected invalid cron for {expr:?}"
			);
		}
	}

	#[test]
	fn test_rejects_malformed_fields() {
		assert!(validate_cron_expression("61 * * * *").is_err());
		assert!(validate_cron_expression("foo bar baz qux quux").is_err());
	}

	#[test]
	fn test_accepts_common_expressions() {
		for expr in ["*/15 * * * *", "*/10 * * * *", "0 0 * * *", "*/5 * * * * *"] {
			assert!(validate_cron_expression(expr).is_ok(), "{expr} should parse");
		}
	}

	#[test]
	fn test_unix_sunday_is_accepted() {
		// 2025-03-01 is a Saturday.
		let after = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
		for expr in ["0 0 * * 0", "0 0 * * 7"] {
			let schedule = CronSchedule::parse(expr).unwrap();
			let next = schedule.next_after(after, Tz::UTC).unwrap();
			assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap(), "{expr}");
		}
	}

	#[test]
	fn test_unix_monday_is_monday() {
		let schedule = CronSchedule::parse("0 9 * * 1").unwrap();
		let after = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
		let next = schedule.next_after(after, Tz::UTC).unwrap();
		assert_eq!(next.weekday(), Weekday::Mon);
		assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap());
	}

	#[test]
	fn test_weekday_range_skips_weekend() {
		let schedule = CronSchedule::parse("0 9 * * 1-5").unwrap();
		let mut at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
		let mut seen = Vec::new();
		for _ in 0..7 {
			at = schedule.next_after(at, Tz::UTC).unwrap();
			seen.push(at.weekday());
		}
		assert_eq!(
			seen,
			vec![
				Weekday::Mon,
				Weekday::Tue,
				Weekday::Wed,
				Weekday::Thu,
				Weekday::Fri,
				Weekday::Mon,
				Weekday::Tue
			]
		);
	}

	#[test]
	fn test_weekday_lists_ranges_and_steps_are_remapped() {
		assert_eq!(to_cron_crate_format("0 0 * * 0").unwrap(), "0 0 0 * * 1");
		assert_eq!(to_cron_crate_format("0 0 * * 1-5").unwrap(), "0 0 0 * * 2,3,4,5,6");
		assert_eq!(to_cron_crate_format("0 0 * * 5-7").unwrap(), "0 0 0 * * 1,6,7");
		assert_eq!(to_cron_crate_format("0 0 * * 0,3").unwrap(), "0 0 0 * * 1,4");
		assert_eq!(to_cron_crate_format("0 0 * * 1-6/2").unwrap(), "0 0 0 * * 2,4,6");
		assert_eq!(to_cron_crate_format("0 0 * * 1/3").unwrap(), "0 0 0 * * 2,5");
		assert_eq!(to_cron_crate_format("0 0 * * */2").unwrap(), "0 0 0 * * */2");
		assert_eq!(to_cron_crate_format("0 0 * * MON-FRI").unwrap(), "0 0 0 * * MON-FRI");
		// Six-field expressions are left alone.
		assert_eq!(to_cron_crate_format("0 0 0 * * 1").unwrap(), "0 0 0 * * 1");
	}

	#[test]
	fn test_rejects_out_of_range_weekday() {
		assert!(validate_cron_expression("0 0 * * 8").is_err());
		assert!(validate_cron_expression("0 0 * * 5-2").is_err());
		assert!(validate_cron_expression("0 0 * * 1-5/0").is_err());
	}

	#[test]
	fn test_expression_is_preserved() {
		let schedule = CronSchedule::parse("  */10 * * * *  ").unwrap();
		assert_eq!(schedule.expression(), "*/10 * * * *");
	}

	#[test]
	fn test_parse_timezone() {
		assert_eq!(parse_timezone("UTC").unwrap(), Tz::UTC);
		assert!(matches!(
			parse_timezone("Mars/Olympus_Mons"),
			Err(JobError::InvalidTimezone(_))
		));
	}
}
