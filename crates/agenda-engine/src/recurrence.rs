//! Recurrence mapping: domain `RecurringOptions` to an RFC 5545 recurrence rule.
//!
//! Units map through `FREQUENCY_TABLE`. Expansion of a rule into concrete occurrence
//! windows goes through the `rrule` crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rrule::{Frequency, RRuleSet};

use crate::appointment::{FrequencyUnit, RecurringOptions, TimeWindow};
use crate::error::{EngineError, Result};

/// Domain unit, rule frequency, and the `FREQ=` token written into documents.
///
/// `FrequencyUnit::Unspecified` has no row and therefore maps to no rule.
const FREQUENCY_TABLE: [(FrequencyUnit, Frequency, &str); 7] = [
    (FrequencyUnit::Seconds, Frequency::Secondly, "SECONDLY"),
    (FrequencyUnit::Minutes, Frequency::Minutely, "MINUTELY"),
    (FrequencyUnit::Hours, Frequency::Hourly, "HOURLY"),
    (FrequencyUnit::Days, Frequency::Daily, "DAILY"),
    (FrequencyUnit::Weeks, Frequency::Weekly, "WEEKLY"),
    (FrequencyUnit::Months, Frequency::Monthly, "MONTHLY"),
    (FrequencyUnit::Years, Frequency::Yearly, "YEARLY"),
];

/// Rule frequency for a domain unit, or `None` for an unset/unmapped unit.
pub fn frequency_for(unit: FrequencyUnit) -> Option<Frequency> {
    FREQUENCY_TABLE
        .iter()
        .find(|(u, _, _)| *u == unit)
        .map(|(_, freq, _)| *freq)
}

fn freq_token(frequency: Frequency) -> &'static str {
    FREQUENCY_TABLE
        .iter()
        .find(|(_, freq, _)| *freq == frequency)
        .map(|(_, _, token)| *token)
        .unwrap_or("DAILY")
}

fn freq_from_token(token: &str) -> Option<Frequency> {
    FREQUENCY_TABLE
        .iter()
        .find(|(_, _, t)| t.eq_ignore_ascii_case(token))
        .map(|(_, freq, _)| *freq)
}

/// Translate optional recurrence options into a rule.
///
/// Absent options, or a unit with no table entry, mean a single occurrence. `interval`
/// and `count` are carried through exactly as given, zero and negative counts included.
pub fn map_recurrence(options: Option<&RecurringOptions>) -> Option<RecurrenceRule> {
    let options = options?;
    let frequency = frequency_for(options.frequency)?;
    Some(RecurrenceRule {
        frequency,
        interval: options.interval,
        count: options.count,
    })
}

/// A frequency + interval + optional occurrence count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    /// `None` means the rule repeats without bound.
    pub count: Option<i32>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, interval: u32, count: Option<i32>) -> Self {
        Self {
            frequency,
            interval,
            count,
        }
    }

    /// Expand the rule from `start` into occurrence windows of `duration_minutes` each.
    ///
    /// At most `limit` windows are returned; a `COUNT` below the limit wins.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRule` for a negative count, a zero interval, or any
    /// rule the `rrule` crate refuses.
    pub fn occurrences(
        &self,
        start: DateTime<Utc>,
        duration_minutes: u32,
        limit: u16,
    ) -> Result<Vec<TimeWindow>> {
        if self.count == Some(0) || limit == 0 {
            return Ok(Vec::new());
        }
        if let Some(count) = self.count.filter(|c| *c < 0) {
            return Err(EngineError::InvalidRule(format!(
                "COUNT must not be negative, got {count}"
            )));
        }
        if self.interval == 0 {
            return Err(EngineError::InvalidRule(
                "INTERVAL must be at least 1".to_string(),
            ));
        }

        let rrule_text = format!("DTSTART:{}\nRRULE:{}", start.format("%Y%m%dT%H%M%SZ"), self);
        let rrule_set: RRuleSet = rrule_text
            .parse()
            .map_err(|e| EngineError::InvalidRule(format!("{}", e)))?;

        let max_count = self
            .count
            .map(|c| u16::try_from(c).unwrap_or(u16::MAX).min(limit))
            .unwrap_or(limit);
        let duration = Duration::minutes(i64::from(duration_minutes));

        Ok(rrule_set
            .all(max_count)
            .dates
            .into_iter()
            .map(|dt| {
                let start_utc = dt.with_timezone(&Utc);
                TimeWindow::new(start_utc, start_utc + duration)
            })
            .collect())
    }
}

impl fmt::Display for RecurrenceRule {
    /// RRULE value, e.g. `FREQ=WEEKLY;INTERVAL=2;COUNT=10`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FREQ={};INTERVAL={}",
            freq_token(self.frequency),
            self.interval
        )?;
        if let Some(count) = self.count {
            write!(f, ";COUNT={}", count)?;
        }
        Ok(())
    }
}

impl FromStr for RecurrenceRule {
    type Err = EngineError;

    /// Parse an RRULE value. Parts other than FREQ, INTERVAL, and COUNT are ignored.
    fn from_str(value: &str) -> Result<Self> {
        let mut frequency = None;
        let mut interval = 1;
        let mut count = None;

        for part in value.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, val) = part
                .split_once('=')
                .ok_or_else(|| EngineError::Parse(format!("malformed RRULE part '{part}'")))?;
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    frequency = Some(freq_from_token(val.trim()).ok_or_else(|| {
                        EngineError::Parse(format!("unknown FREQ '{}'", val.trim()))
                    })?);
                }
                "INTERVAL" => {
                    interval = val.trim().parse().map_err(|_| {
                        EngineError::Parse(format!("invalid INTERVAL '{}'", val.trim()))
                    })?;
                }
                "COUNT" => {
                    count = Some(val.trim().parse().map_err(|_| {
                        EngineError::Parse(format!("invalid COUNT '{}'", val.trim()))
                    })?);
                }
                _ => {}
            }
        }

        let frequency =
            frequency.ok_or_else(|| EngineError::Parse(format!("RRULE without FREQ: '{value}'")))?;
        Ok(Self {
            frequency,
            interval,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mapped_unit_round_trips_through_its_token() {
        for (unit, freq, token) in FREQUENCY_TABLE {
            assert_eq!(frequency_for(unit), Some(freq));
            assert_eq!(freq_token(freq), token);
            assert_eq!(freq_from_token(token), Some(freq));
        }
    }

    #[test]
    fn unspecified_unit_has_no_row() {
        assert_eq!(frequency_for(FrequencyUnit::Unspecified), None);
    }

    #[test]
    fn unbounded_rule_omits_count() {
        let rule = RecurrenceRule::new(Frequency::Monthly, 3, None);
        assert_eq!(rule.to_string(), "FREQ=MONTHLY;INTERVAL=3");
    }
}
