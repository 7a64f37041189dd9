//! Detect scheduling conflicts between a candidate and existing appointments.
//!
//! An existing appointment conflicts with the candidate when it is not cancelled, its
//! window overlaps the candidate's window, and the two share at least one participant.
//! Adjacent windows (one ends exactly when the other starts) are NOT conflicts.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::appointment::{Appointment, AppointmentId, ParticipantId, TimeWindow};

/// The time window and participants of an appointment that is about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictQuery {
    pub window: TimeWindow,
    pub participant_ids: BTreeSet<ParticipantId>,
    /// Existing appointment to skip, so an update does not collide with itself.
    pub exclude: Option<AppointmentId>,
}

impl ConflictQuery {
    pub fn new<I, P>(window: TimeWindow, participant_ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParticipantId>,
    {
        Self {
            window,
            participant_ids: participant_ids.into_iter().map(Into::into).collect(),
            exclude: None,
        }
    }

    /// Query for `appointment`'s own window and participants, skipping its own id.
    pub fn for_appointment(appointment: &Appointment) -> Self {
        Self {
            window: appointment.window(),
            participant_ids: appointment.participant_ids().into_iter().cloned().collect(),
            exclude: appointment.id,
        }
    }
}

/// An existing appointment that collides with the candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub appointment: Appointment,
    pub overlap_minutes: i64,
    /// Participants booked in both, in id order.
    pub shared_participants: Vec<ParticipantId>,
}

/// Find every appointment in `existing` that conflicts with `candidate`.
///
/// `existing` may be pre-filtered by the store or be the full set; the overlap test is
/// applied either way. Results follow the order of `existing`, which callers should not
/// rely on. A candidate without participants never conflicts.
pub fn find_conflicts(candidate: &ConflictQuery, existing: &[Appointment]) -> Vec<Conflict> {
    if candidate.participant_ids.is_empty() {
        return Vec::new();
    }

    let conflicts: Vec<Conflict> = existing
        .iter()
        .filter(|a| !a.is_cancelled())
        .filter(|a| candidate.exclude.is_none() || a.id != candidate.exclude)
        .filter_map(|a| {
            let overlap_minutes = a.window().overlap_minutes(&candidate.window)?;
            let shared_participants: Vec<ParticipantId> = a
                .participant_ids()
                .into_iter()
                .filter(|id| candidate.participant_ids.contains(*id))
                .cloned()
                .collect();
            if shared_participants.is_empty() {
                return None;
            }
            Some(Conflict {
                appointment: a.clone(),
                overlap_minutes,
                shared_participants,
            })
        })
        .collect();

    debug!(
        scanned = existing.len(),
        conflicts = conflicts.len(),
        "conflict scan finished"
    );
    conflicts
}
