//! Appointment lifecycle: create, update, cancel, delete.
//!
//! Ties the conflict scan and the calendar encoder to a datastore:
//!
//! - **create** scans for conflicts first and writes nothing when any are found;
//!   otherwise it generates the document and inserts the appointment.
//! - **update** regenerates the document from the current fields (or cancels it when the
//!   status says so). The conflict scan only runs here when
//!   [`EngineConfig::recheck_conflicts_on_update`] is set.
//! - **cancel** flips the status and rewrites the stored document in place.

use tracing::{info, warn};

use crate::appointment::{Appointment, AppointmentId, AppointmentStatus};
use crate::config::EngineConfig;
use crate::conflict::{find_conflicts, Conflict, ConflictQuery};
use crate::encoder::CalendarEncoder;
use crate::error::{EngineError, Result};
use crate::store::AppointmentStore;

/// Result of [`AppointmentService::create`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// Stored, with its id and calendar document set.
    Created(Appointment),
    /// Nothing was stored.
    Conflicted(Vec<Conflict>),
}

/// Result of [`AppointmentService::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Appointment),
    /// Only produced when conflict re-checking on update is enabled.
    Conflicted(Vec<Conflict>),
}

pub struct AppointmentService<S> {
    store: S,
    encoder: CalendarEncoder,
    config: EngineConfig,
}

impl<S: AppointmentStore> AppointmentService<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            encoder: CalendarEncoder::new(&config),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn encoder(&self) -> &CalendarEncoder {
        &self.encoder
    }

    pub fn get(&self, id: &AppointmentId) -> Result<Option<Appointment>> {
        self.store.get(id)
    }

    /// Schedule a new appointment unless it collides with an existing one.
    pub fn create(&mut self, mut appointment: Appointment) -> Result<CreateOutcome> {
        appointment.status = AppointmentStatus::Scheduled;

        let mut query = ConflictQuery::for_appointment(&appointment);
        query.exclude = None;
        let conflicts = self.scan(&query)?;
        if !conflicts.is_empty() {
            warn!(
                conflicts = conflicts.len(),
                start = %appointment.date_time,
                "appointment not created: conflicts found"
            );
            return Ok(CreateOutcome::Conflicted(conflicts));
        }

        self.encoder.update_calendar(&mut appointment)?;
        let created = self.store.insert(appointment)?;
        if let Some(id) = created.id {
            info!(%id, participants = created.num_participants, "appointment created");
        }
        Ok(CreateOutcome::Created(created))
    }

    /// Write new field values for an existing appointment and resynchronize its document.
    ///
    /// A cancelled appointment without a document in the payload is cancelled against
    /// the stored one.
    pub fn update(&mut self, mut appointment: Appointment) -> Result<UpdateOutcome> {
        let id = appointment.id.ok_or(EngineError::MissingId)?;
        if self.store.get(&id)?.is_none() {
            return Err(EngineError::NotFound(id));
        }

        if appointment.is_cancelled() && appointment.ical_data.is_none() {
            appointment.ical_data = self.store.load_calendar(&id)?;
        }

        if self.config.recheck_conflicts_on_update && !appointment.is_cancelled() {
            let conflicts = self.scan(&ConflictQuery::for_appointment(&appointment))?;
            if !conflicts.is_empty() {
                warn!(%id, conflicts = conflicts.len(), "appointment not updated: conflicts found");
                return Ok(UpdateOutcome::Conflicted(conflicts));
            }
        }

        self.encoder.update_calendar(&mut appointment)?;
        self.store.update(&appointment)?;
        info!(%id, status = ?appointment.status, "appointment updated");
        Ok(UpdateOutcome::Updated(appointment))
    }

    /// Cancel a stored appointment, keeping its original occurrence data in the document.
    pub fn cancel(&mut self, id: &AppointmentId) -> Result<Appointment> {
        let mut appointment = self.store.get(id)?.ok_or(EngineError::NotFound(*id))?;
        if appointment.ical_data.is_none() {
            appointment.ical_data = self.store.load_calendar(id)?;
        }

        appointment.status = AppointmentStatus::Cancelled;
        self.encoder.update_calendar(&mut appointment)?;
        self.store.update(&appointment)?;
        info!(%id, "appointment cancelled");
        Ok(appointment)
    }

    /// Remove an appointment along with its participants and recurrence options.
    pub fn delete(&mut self, id: &AppointmentId) -> Result<Appointment> {
        let removed = self.store.delete(id)?.ok_or(EngineError::NotFound(*id))?;
        info!(%id, "appointment deleted");
        Ok(removed)
    }

    fn scan(&self, query: &ConflictQuery) -> Result<Vec<Conflict>> {
        let existing = self.store.find_overlapping(&query.window)?;
        Ok(find_conflicts(query, &existing))
    }
}
