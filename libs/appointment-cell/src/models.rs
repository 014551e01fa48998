// libs/appointment-cell/src/models.rs
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppointmentError;

pub const MAX_NOTES_LENGTH: usize = 2000;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// A freshly booked appointment, not yet persisted.
    pub fn scheduled(user_id: Uuid, doctor_id: Uuid, date: DateTime<Utc>, notes: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            doctor_id,
            date,
            status: AppointmentStatus::Scheduled,
            notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// The doctor-schedule slot this appointment occupies.
    pub fn slot(&self) -> SlotRef {
        SlotRef::new(self.doctor_id, self.date)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Canceled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Canceled => write!(f, "canceled"),
        }
    }
}

// ==============================================================================
// DOCTOR SCHEDULE SLOTS
// ==============================================================================

/// Identity of a slot owned by the doctor-schedule service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub doctor_id: Uuid,
    pub slot_time: DateTime<Utc>,
}

impl SlotRef {
    pub fn new(doctor_id: Uuid, slot_time: DateTime<Utc>) -> Self {
        Self { doctor_id, slot_time }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.doctor_id,
            self.slot_time.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub available: bool,
    pub reason: String,
}

impl SlotAvailability {
    pub fn available() -> Self {
        Self { available: true, reason: String::new() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { available: false, reason: reason.into() }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    /// Rejects requests that must never reach the doctor service.
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.user_id.is_nil() {
            return Err(AppointmentError::Validation("user_id is required".to_string()));
        }
        if self.doctor_id.is_nil() {
            return Err(AppointmentError::Validation("doctor_id is required".to_string()));
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LENGTH {
                return Err(AppointmentError::Validation(format!(
                    "notes must be at most {} characters",
                    MAX_NOTES_LENGTH
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentResponse {
    pub id: String,
    pub user_id: String,
    pub doctor_id: String,
    pub date: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id.to_string(),
            user_id: appointment.user_id.to_string(),
            doctor_id: appointment.doctor_id.to_string(),
            date: appointment.date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            status: appointment.status,
            notes: appointment.notes,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub total_count: usize,
    pub appointments: Vec<AppointmentResponse>,
}

impl From<Vec<Appointment>> for AppointmentListResponse {
    fn from(appointments: Vec<Appointment>) -> Self {
        let appointments: Vec<AppointmentResponse> =
            appointments.into_iter().map(AppointmentResponse::from).collect();
        Self {
            total_count: appointments.len(),
            appointments,
        }
    }
}
