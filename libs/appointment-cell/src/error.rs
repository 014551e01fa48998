use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use shared_models::AppError;

/// Failures of the durable appointment store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the cache layer. Never surfaced to callers of the booking flow.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Cache operation timed out")]
    Timeout,

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Failures talking to the doctor-schedule service.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("doctor service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("doctor service responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("doctor service refused the slot change")]
    Rejected,

    #[error("invalid response from doctor service: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidResponse(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment slot not available: {reason}")]
    SlotUnavailable { reason: String },

    #[error("Doctor service unavailable: {0}")]
    RemoteUnavailable(#[source] RemoteError),

    #[error("Failed to reserve time slot: {0}")]
    ReservationFailed(#[source] RemoteError),

    #[error("Failed to release time slot: {0}")]
    ReleaseFailed(#[source] RemoteError),

    #[error("Appointment store error: {0}")]
    Store(#[source] StoreError),

    #[error(
        "Failed to create appointment ({create}); releasing slot {doctor_id}@{slot_time} also failed ({compensation})"
    )]
    CreateFailedCompensationFailed {
        doctor_id: Uuid,
        slot_time: DateTime<Utc>,
        create: StoreError,
        compensation: RemoteError,
    },

    #[error(
        "Failed to delete appointment {appointment_id} ({delete}); re-reserving slot {doctor_id}@{slot_time} also failed ({compensation})"
    )]
    DeleteFailedCompensationFailed {
        appointment_id: Uuid,
        doctor_id: Uuid,
        slot_time: DateTime<Utc>,
        delete: StoreError,
        compensation: RemoteError,
    },
}

/// What the caller of a booking operation can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    Validation,
    NotFound,
    Conflict,
    RemoteUnavailable,
    Internal,
}

impl AppointmentError {
    pub fn outcome(&self) -> BookingOutcome {
        match self {
            AppointmentError::Validation(_) => BookingOutcome::Validation,
            AppointmentError::NotFound => BookingOutcome::NotFound,
            AppointmentError::SlotUnavailable { .. } => BookingOutcome::Conflict,
            AppointmentError::ReservationFailed(RemoteError::Rejected) => BookingOutcome::Conflict,
            AppointmentError::RemoteUnavailable(_)
            | AppointmentError::ReservationFailed(_)
            | AppointmentError::ReleaseFailed(_) => BookingOutcome::RemoteUnavailable,
            AppointmentError::Store(_)
            | AppointmentError::CreateFailedCompensationFailed { .. }
            | AppointmentError::DeleteFailedCompensationFailed { .. } => BookingOutcome::Internal,
        }
    }

    /// True when slot state and the ledger disagree and an operator must fix it.
    pub fn requires_reconciliation(&self) -> bool {
        matches!(
            self,
            AppointmentError::CreateFailedCompensationFailed { .. }
                | AppointmentError::DeleteFailedCompensationFailed { .. }
        )
    }
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppointmentError::NotFound,
            other => AppointmentError::Store(other),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err.outcome() {
            BookingOutcome::Validation => AppError::ValidationError(message),
            BookingOutcome::NotFound => AppError::NotFound(message),
            BookingOutcome::Conflict => AppError::Conflict(message),
            BookingOutcome::RemoteUnavailable => AppError::ServiceUnavailable(message),
            BookingOutcome::Internal => AppError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_becomes_appointment_not_found() {
        assert!(matches!(AppointmentError::from(StoreError::NotFound), AppointmentError::NotFound));
        assert!(matches!(
            AppointmentError::from(StoreError::Database("down".into())),
            AppointmentError::Store(StoreError::Database(_))
        ));
    }

    #[test]
    fn only_compensation_failures_need_reconciliation() {
        let fatal = AppointmentError::CreateFailedCompensationFailed {
            doctor_id: Uuid::new_v4(),
            slot_time: Utc::now(),
            create: StoreError::Database("insert failed".into()),
            compensation: RemoteError::Timeout(Duration::from_secs(5)),
        };
        assert!(fatal.requires_reconciliation());
        assert_eq!(fatal.outcome(), BookingOutcome::Internal);
        assert!(fatal.to_string().contains("insert failed"));

        let ordinary = AppointmentError::Store(StoreError::Database("insert failed".into()));
        assert!(!ordinary.requires_reconciliation());
        assert_eq!(ordinary.outcome(), BookingOutcome::Internal);
    }

    #[test]
    fn rejected_reservation_is_a_conflict() {
        assert_eq!(
            AppointmentError::ReservationFailed(RemoteError::Rejected).outcome(),
            BookingOutcome::Conflict
        );
        assert_eq!(
            AppointmentError::ReservationFailed(RemoteError::Transport("reset".into())).outcome(),
            BookingOutcome::RemoteUnavailable
        );
    }
}
