//! Recurrence expression handling.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::ManagerError;

/// A parsed recurrence expression.
///
/// Keeps the expression exactly as registered alongside the schedule used to
/// compute fire times.
#[derive(Debug, Clone)]
pub struct Recurrence {
    expression: String,
    schedule: Schedule,
}

impl Recurrence {
    /// Parse a cron expression.
    ///
    /// Accepts the six/seven field form (`sec min hour dom month dow [year]`),
    /// the classic five field form (`min hour dom month dow`, evaluated at
    /// second zero) and the `@daily`-style shorthands.
    ///
    /// Five field expressions use classic day-of-week numbering (0-7, with
    /// both 0 and 7 meaning Sunday); longer forms use the `cron` crate's
    /// 1-7 numbering starting at Sunday.
    pub fn parse(expression: &str) -> Result<Self, ManagerError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let schedule = if let [minute, hour, day_of_month, month, day_of_week] = fields[..] {
            let day_of_week = classic_day_of_week(day_of_week, expression)?;
            Schedule::from_str(&format!(
                "0 {} {} {} {} {}",
                minute, hour, day_of_month, month, day_of_week
            ))
        } else {
            Schedule::from_str(expression.trim())
        }
        .map_err(|e| invalid(expression, e.to_string()))?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// The expression as originally given.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

fn invalid(expression: &str, reason: impl Into<String>) -> ManagerError {
    ManagerError::InvalidRecurrence {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

/// Rewrite a classic day-of-week field into `cron` crate numbering.
///
/// Numeric items (single days, ranges, steps, `*/n`) are expanded into an
/// explicit list of days; named items such as `MON-FRI` pass through.
fn classic_day_of_week(field: &str, expression: &str) -> Result<String, ManagerError> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let parse_day = |value: &str| -> Result<u32, ManagerError> {
        match value.parse::<u32>() {
            Ok(day) if day <= 7 => Ok(day),
            _ => Err(invalid(
                expression,
                format!("day of week '{}' is not in 0-7", value),
            )),
        }
    };

    let mut days = BTreeSet::new();
    let mut named = Vec::new();

    for item in field.split(',') {
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(item.to_string());
            continue;
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => match step.parse::<usize>() {
                Ok(step) if step > 0 => (range, Some(step)),
                _ => return Err(invalid(expression, format!("invalid step in '{}'", item))),
            },
            None => (item, None),
        };

        let (start, end) = match (range, range.split_once('-')) {
            ("*", _) => (0, 6),
            (_, Some((start, end))) => (parse_day(start)?, parse_day(end)?),
            (single, None) => {
                let day = parse_day(single)?;
                // `n/step` runs from n to the end of the week
                (day, if step.is_some() { day.max(6) } else { day })
            }
        };
        if start > end {
            return Err(invalid(
                expression,
                format!("day of week range '{}' runs backwards", item),
            ));
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days.insert(day % 7 + 1);
        }
    }

    let mut items: Vec<String> = days.iter().map(|day| day.to_string()).collect();
    items.extend(named);
    Ok(items.join(","))
}
