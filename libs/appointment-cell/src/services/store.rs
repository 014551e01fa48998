// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::error::StoreError;
use crate::models::Appointment;

/// Durable CRUD for appointment records. Soft-deleted records are invisible
/// to every read.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError>;

    /// Writes `status` and `notes` only. Owner, doctor and slot time are fixed
    /// at creation.
    async fn update(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError>;
}

// ==============================================================================
// SUPABASE (POSTGREST)
// ==============================================================================

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn with_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, StoreError> {
        self.supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(database_error)
    }

    async fn patch_one(&self, id: Uuid, body: serde_json::Value) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}&deleted_at=is.null", APPOINTMENTS_PATH, id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_returning(Method::PATCH, &path, None, Some(body))
            .await
            .map_err(database_error)?;

        rows.into_iter().next().ok_or(StoreError::NotFound)
    }
}

fn database_error(err: anyhow::Error) -> StoreError {
    error!("Appointment store request failed: {}", err);
    StoreError::Database(err.to_string())
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        debug!("Inserting appointment {}", appointment.id);

        let body = serde_json::to_value(appointment)?;
        let rows: Vec<Appointment> = self
            .supabase
            .request_returning(Method::POST, APPOINTMENTS_PATH, None, Some(body))
            .await
            .map_err(database_error)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Database("insert returned no rows".to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}&deleted_at=is.null", APPOINTMENTS_PATH, id);
        self.fetch(&path)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        debug!("Updating appointment {}", appointment.id);

        self.patch_one(
            appointment.id,
            json!({
                "status": appointment.status,
                "notes": appointment.notes,
                "updated_at": Utc::now(),
            }),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        debug!("Soft-deleting appointment {}", id);

        let now = Utc::now();
        self.patch_one(id, json!({ "deleted_at": now, "updated_at": now }))
            .await
            .map(|_| ())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?user_id=eq.{}&deleted_at=is.null&order=date.asc",
            APPOINTMENTS_PATH, user_id
        );
        self.fetch(&path).await
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&deleted_at=is.null&order=date.asc",
            APPOINTMENTS_PATH, doctor_id
        );
        self.fetch(&path).await
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (not soft-deleted) record count.
    pub async fn live_count(&self) -> usize {
        self.rows.read().await.values().filter(|a| !a.is_deleted()).count()
    }

    async fn list_where<F>(&self, predicate: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut appointments: Vec<Appointment> = self
            .rows
            .read()
            .await
            .values()
            .filter(|a| !a.is_deleted() && predicate(a))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.date);
        appointments
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&appointment.id) {
            return Err(StoreError::Database(format!(
                "duplicate appointment id {}",
                appointment.id
            )));
        }
        rows.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.rows
            .read()
            .await
            .get(&id)
            .filter(|a| !a.is_deleted())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&appointment.id) {
            Some(existing) if !existing.is_deleted() => {
                existing.status = appointment.status;
                existing.notes = appointment.notes.clone();
                existing.updated_at = Utc::now();
                Ok(existing.clone())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(existing) if !existing.is_deleted() => {
                let now = Utc::now();
                existing.deleted_at = Some(now);
                existing.updated_at = now;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.list_where(|a| a.user_id == user_id).await)
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.list_where(|a| a.doctor_id == doctor_id).await)
    }
}
