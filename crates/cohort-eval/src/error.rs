//! Per-patient runtime errors
//!
//! Neither error stops a run. A [`DateResolutionError`] leaves the affected variable
//! missing; an [`EventStoreError`] excludes the patient from the population.

use crate::store::PatientId;
use cohort_diagnostics::{COH0200, COH0300, COH0301, COH0302, ErrorCode};
use thiserror::Error;

/// A relative date could not be turned into a calendar date
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateResolutionError {
    /// The anchor variable has no date for this patient
    #[error("Anchor variable '{name}' has no resolved date")]
    UnresolvedAnchor { name: String },

    /// The expression or its literal date does not parse
    #[error("Malformed date expression '{expression}': {reason}")]
    MalformedLiteral { expression: String, reason: String },

    /// Offset arithmetic left the supported calendar range
    #[error("Date arithmetic out of range in '{expression}'")]
    OutOfRange { expression: String },
}

impl DateResolutionError {
    pub fn code(&self) -> ErrorCode {
        COH0200
    }
}

/// Event store query failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventStoreError {
    #[error("Query failed for patient {patient}: {message}")]
    QueryFailed { patient: PatientId, message: String },

    #[error("Query for patient {patient} timed out after {millis} ms")]
    Timeout { patient: PatientId, millis: u64 },

    #[error("Unknown patient {patient}")]
    UnknownPatient { patient: PatientId },

    /// The store cannot be read at all
    #[error("Event store unavailable: {message}")]
    Unavailable { message: String },
}

impl EventStoreError {
    pub fn query_failed(patient: PatientId, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            patient,
            message: message.into(),
        }
    }

    /// Patient the failure belongs to, if it is patient-level
    pub fn patient(&self) -> Option<PatientId> {
        match self {
            Self::QueryFailed { patient, .. }
            | Self::Timeout { patient, .. }
            | Self::UnknownPatient { patient } => Some(*patient),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => COH0301,
            Self::Unavailable { .. } => COH0302,
            _ => COH0300,
        }
    }
}
