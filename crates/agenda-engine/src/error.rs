//! Error types for agenda-engine operations.

use thiserror::Error;

use crate::appointment::AppointmentId;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The calendar document (or a rule inside it) could not be read.
    #[error("Calendar parse error: {0}")]
    Parse(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Appointment has not been persisted yet")]
    MissingId,

    #[error("Appointment not found: {0}")]
    NotFound(AppointmentId),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
