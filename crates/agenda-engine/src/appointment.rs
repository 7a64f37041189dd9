//! Appointment data model.
//!
//! An [`Appointment`] is a mutable record owned by the datastore. The engine only ever
//! works on a borrowed or cloned copy of it: the conflict scan reads its time window and
//! participant set, and the encoder rewrites its `iCalData` field.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::recurrence;

/// Storage-assigned appointment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(Uuid);

impl AppointmentId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AppointmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AppointmentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Participant identifier. Conflicts compare these by identity only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Link between an appointment and one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub participant_id: ParticipantId,
}

impl Participant {
    pub fn new(participant_id: impl Into<ParticipantId>) -> Self {
        Self {
            participant_id: participant_id.into(),
        }
    }
}

/// Lifecycle status. Anything that is not `CANCELLED` reads as `SCHEDULED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Cancelled,
    #[default]
    #[serde(other)]
    Scheduled,
}

/// Domain-level frequency unit of a repeating appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencyUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
    /// Unset or unrecognized unit. Maps to "no recurrence".
    #[default]
    #[serde(other)]
    Unspecified,
}

/// How an appointment repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringOptions {
    #[serde(rename = "type")]
    pub frequency: FrequencyUnit,
    /// Step between occurrences. Expected to be at least 1; not clamped.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Total number of occurrences, `None` for unbounded. Carried through unvalidated.
    #[serde(default)]
    pub count: Option<i32>,
}

fn default_interval() -> u32 {
    1
}

impl RecurringOptions {
    pub fn new(frequency: FrequencyUnit, interval: u32, count: Option<i32>) -> Self {
        Self {
            frequency,
            interval,
            count,
        }
    }
}

/// A half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn from_minutes(start: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    /// Two windows overlap iff `a.start < b.end && a.end > b.start`.
    ///
    /// Windows that only touch (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Length of the shared part of both windows, in whole minutes.
    pub fn overlap_minutes(&self, other: &TimeWindow) -> Option<i64> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        Some((end - start).num_minutes())
    }
}

/// An appointment among zero or more participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AppointmentId>,
    pub date_time: DateTime<Utc>,
    pub expected_duration_minutes: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub recurring_frequency: Option<RecurringOptions>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub participants: Vec<Participant>,
    /// Kept equal to `participants.len()` by whoever writes the record.
    #[serde(default)]
    pub num_participants: usize,
    #[serde(default, rename = "iCalData")]
    pub ical_data: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Participant>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Participant>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Appointment {
    /// A scheduled, non-recurring appointment with no participants and no document yet.
    pub fn new(
        date_time: DateTime<Utc>,
        expected_duration_minutes: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            date_time,
            expected_duration_minutes,
            description: description.into(),
            location: None,
            status: AppointmentStatus::Scheduled,
            recurring: false,
            recurring_frequency: None,
            participants: Vec::new(),
            num_participants: 0,
            ical_data: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_participants<I, P>(mut self, participant_ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParticipantId>,
    {
        self.set_participants(participant_ids.into_iter().map(Participant::new).collect());
        self
    }

    pub fn with_recurrence(mut self, options: RecurringOptions) -> Self {
        self.recurring = true;
        self.recurring_frequency = Some(options);
        self
    }

    /// Replace the participant list and keep `num_participants` in step with it.
    pub fn set_participants(&mut self, participants: Vec<Participant>) {
        self.num_participants = participants.len();
        self.participants = participants;
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.window().end
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_minutes(self.date_time, self.expected_duration_minutes)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }

    pub fn participant_ids(&self) -> BTreeSet<&ParticipantId> {
        self.participants.iter().map(|p| &p.participant_id).collect()
    }

    /// The recurrence options that actually apply: present only when `recurring` is set.
    pub fn active_recurrence(&self) -> Option<&RecurringOptions> {
        if self.recurring {
            self.recurring_frequency.as_ref()
        } else {
            None
        }
    }

    /// Concrete occurrence windows, capped at `limit`.
    ///
    /// A non-recurring appointment (or one whose unit maps to no rule) yields its own
    /// window.
    pub fn occurrences(&self, limit: u16) -> Result<Vec<TimeWindow>> {
        match recurrence::map_recurrence(self.active_recurrence()) {
            Some(rule) => rule.occurrences(self.date_time, self.expected_duration_minutes, limit),
            None => Ok(vec![self.window()]),
        }
    }
}
