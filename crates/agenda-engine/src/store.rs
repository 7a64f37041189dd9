//! Datastore collaborator.
//!
//! The engine never owns persistence. [`AppointmentStore`] is the seam a real backend
//! implements; [`InMemoryStore`] backs the tests.
//!
//! Mutating methods take `&mut self`, so the read-check-insert sequence in
//! [`crate::service::AppointmentService::create`] runs under exclusive access. A store
//! shared between threads must keep that property itself (a lock or a serializable
//! transaction around the whole create).

use std::collections::BTreeMap;

use crate::appointment::{Appointment, AppointmentId, TimeWindow};
use crate::error::{EngineError, Result};

pub trait AppointmentStore {
    /// Appointments whose window may overlap `window`.
    ///
    /// Returning a superset (even the whole store, cancelled entries included) is
    /// allowed; the conflict scan re-applies the exact test.
    fn find_overlapping(&self, window: &TimeWindow) -> Result<Vec<Appointment>>;

    fn get(&self, id: &AppointmentId) -> Result<Option<Appointment>>;

    /// Persist a new appointment together with its participants and recurrence options,
    /// assigning an id when it has none.
    fn insert(&mut self, appointment: Appointment) -> Result<Appointment>;

    /// Overwrite an existing appointment.
    fn update(&mut self, appointment: &Appointment) -> Result<()>;

    /// Remove an appointment and everything it owns.
    fn delete(&mut self, id: &AppointmentId) -> Result<Option<Appointment>>;

    /// The stored calendar document of one appointment.
    fn load_calendar(&self, id: &AppointmentId) -> Result<Option<String>> {
        Ok(self.get(id)?.and_then(|a| a.ical_data))
    }
}

/// A `BTreeMap`-backed store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    appointments: BTreeMap<AppointmentId, Appointment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Appointment> {
        self.appointments.values()
    }
}

impl AppointmentStore for InMemoryStore {
    fn find_overlapping(&self, window: &TimeWindow) -> Result<Vec<Appointment>> {
        Ok(self
            .appointments
            .values()
            .filter(|a| !a.is_cancelled() && a.window().overlaps(window))
            .cloned()
            .collect())
    }

    fn get(&self, id: &AppointmentId) -> Result<Option<Appointment>> {
        Ok(self.appointments.get(id).cloned())
    }

    fn insert(&mut self, mut appointment: Appointment) -> Result<Appointment> {
        let id = *appointment.id.get_or_insert_with(AppointmentId::new);
        if self.appointments.contains_key(&id) {
            return Err(EngineError::Store(format!("appointment {id} already exists")));
        }
        self.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    fn update(&mut self, appointment: &Appointment) -> Result<()> {
        let id = appointment.id.ok_or(EngineError::MissingId)?;
        match self.appointments.get_mut(&id) {
            Some(stored) => {
                *stored = appointment.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound(id)),
        }
    }

    fn delete(&mut self, id: &AppointmentId) -> Result<Option<Appointment>> {
        Ok(self.appointments.remove(id))
    }
}
