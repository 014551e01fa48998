// libs/appointment-cell/src/services/slots.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::RemoteError;
use crate::models::{SlotAvailability, SlotRef};

/// Slot capability exposed by the doctor-schedule service.
///
/// `set_availability` must be an idempotent toggle: calling it twice with the
/// same arguments leaves the slot in the same state as calling it once.
/// Timeouts are applied by the caller.
#[async_trait]
pub trait SlotAvailabilityClient: Send + Sync {
    async fn check_availability(&self, slot: SlotRef) -> Result<SlotAvailability, RemoteError>;

    /// Returns the service's `success` flag.
    async fn set_availability(&self, slot: SlotRef, available: bool) -> Result<bool, RemoteError>;
}

#[derive(Debug, Serialize)]
struct CheckTimeAvailabilityRequest {
    doctor_id: Uuid,
    slot_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CheckTimeAvailabilityResponse {
    is_available: bool,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Serialize)]
struct ChangeTimeSlotRequest {
    doctor_id: Uuid,
    slot_time: DateTime<Utc>,
    is_available: bool,
}

#[derive(Debug, Deserialize)]
struct ChangeTimeSlotResponse {
    success: bool,
}

/// JSON-over-HTTP client for the doctor-schedule service.
pub struct HttpSlotAvailabilityClient {
    client: Client,
    base_url: String,
}

impl HttpSlotAvailabilityClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.doctor_service_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        info!("Initializing doctor schedule client for {}", base_url);
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Doctor service error ({}) on {}: {}", status, path, body);
            return Err(RemoteError::Status { status: status.as_u16(), body });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SlotAvailabilityClient for HttpSlotAvailabilityClient {
    async fn check_availability(&self, slot: SlotRef) -> Result<SlotAvailability, RemoteError> {
        debug!("Checking time availability for slot {}", slot);

        let response: CheckTimeAvailabilityResponse = self
            .post(
                "/schedule/slots/availability",
                &CheckTimeAvailabilityRequest {
                    doctor_id: slot.doctor_id,
                    slot_time: slot.slot_time,
                },
            )
            .await?;

        Ok(SlotAvailability {
            available: response.is_available,
            reason: response.reason,
        })
    }

    async fn set_availability(&self, slot: SlotRef, available: bool) -> Result<bool, RemoteError> {
        debug!("Changing time slot {} to available={}", slot, available);

        let response: ChangeTimeSlotResponse = self
            .post(
                "/schedule/slots/change",
                &ChangeTimeSlotRequest {
                    doctor_id: slot.doctor_id,
                    slot_time: slot.slot_time,
                    is_available: available,
                },
            )
            .await?;

        Ok(response.success)
    }
}
