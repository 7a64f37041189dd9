//! # agenda-engine
//!
//! Appointment conflict detection and iCalendar document maintenance.
//!
//! Every appointment carries an RFC 5545 document that must always match its
//! scheduling fields. The engine keeps that document in sync on every write and refuses
//! to create an appointment that double-books one of its participants.
//!
//! ## Modules
//!
//! - [`appointment`]: data model: appointments, participants, recurrence options
//! - [`recurrence`]: recurrence options → RRULE, and occurrence expansion
//! - [`encoder`]: generate, cancel, and decode calendar documents
//! - [`conflict`]: overlap + shared-participant detection
//! - [`store`]: datastore seam and an in-memory implementation
//! - [`service`]: create/update/cancel/delete on top of a store
//! - [`config`]: engine configuration
//! - [`error`]: error types

pub mod appointment;
pub mod config;
pub mod conflict;
pub mod encoder;
pub mod error;
pub mod recurrence;
pub mod service;
pub mod store;

pub use appointment::{
    Appointment, AppointmentId, AppointmentStatus, FrequencyUnit, Participant, ParticipantId,
    RecurringOptions, TimeWindow,
};
pub use config::EngineConfig;
pub use conflict::{find_conflicts, Conflict, ConflictQuery};
pub use encoder::{parse_document, CalendarDocument, CalendarEncoder, EncodedEvent};
pub use error::EngineError;
pub use recurrence::{map_recurrence, RecurrenceRule};
pub use service::{AppointmentService, CreateOutcome, UpdateOutcome};
pub use store::{AppointmentStore, InMemoryStore};
