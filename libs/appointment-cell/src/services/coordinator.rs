// libs/appointment-cell/src/services/coordinator.rs
//
// BOOKING SAGA
// Keeps the appointment ledger and the doctor's slot flags in step without a
// shared transaction. Each step is a single call; a failing later step is
// undone by flipping the slot back. The coordinator never retries.
//

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::{AppointmentError, RemoteError};
use crate::models::{Appointment, AppointmentStatus, CreateAppointmentRequest, SlotAvailability, SlotRef};
use crate::services::metrics::BookingMetrics;
use crate::services::slots::SlotAvailabilityClient;
use crate::services::store::AppointmentStore;

pub struct BookingCoordinator {
    slots: Arc<dyn SlotAvailabilityClient>,
    store: Arc<dyn AppointmentStore>,
    metrics: Arc<BookingMetrics>,
    remote_timeout: Duration,
}

impl BookingCoordinator {
    /// `store` is normally a [`CachedAppointmentStore`](crate::CachedAppointmentStore).
    pub fn new(
        slots: Arc<dyn SlotAvailabilityClient>,
        store: Arc<dyn AppointmentStore>,
        metrics: Arc<BookingMetrics>,
        config: &AppConfig,
    ) -> Self {
        Self {
            slots,
            store,
            metrics,
            remote_timeout: config.remote_timeout(),
        }
    }

    pub fn metrics(&self) -> &BookingMetrics {
        &self.metrics
    }

    // ==========================================================================
    // SAGA OPERATIONS
    // ==========================================================================

    /// Check -> reserve -> persist. A failed persist releases the slot again.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, user_id = %request.user_id))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        request.validate()?;

        let result = self.run_create(request).await;
        match &result {
            Ok(appointment) => {
                self.metrics.record_created();
                info!("Appointment {} booked for slot {}", appointment.id, appointment.slot());
            }
            Err(e) => self.metrics.record_failure(e),
        }
        result
    }

    async fn run_create(&self, request: CreateAppointmentRequest) -> Result<Appointment, AppointmentError> {
        let slot = SlotRef::new(request.doctor_id, request.date);

        let availability = self.check_slot(slot).await.map_err(|e| {
            error!("Failed to check time availability for slot {}: {}", slot, e);
            AppointmentError::RemoteUnavailable(e)
        })?;
        if !availability.available {
            warn!("Time slot {} is not available: {}", slot, availability.reason);
            return Err(AppointmentError::SlotUnavailable { reason: availability.reason });
        }

        self.change_slot(slot, false).await.map_err(|e| {
            error!("Failed to reserve time slot {}: {}", slot, e);
            AppointmentError::ReservationFailed(e)
        })?;
        debug!("Time slot {} reserved", slot);

        let appointment = Appointment::scheduled(
            request.user_id,
            request.doctor_id,
            request.date,
            request.notes.unwrap_or_default(),
        );

        match self.store.create(&appointment).await {
            Ok(created) => Ok(created),
            Err(create_err) => {
                error!("Failed to persist appointment for slot {}, releasing slot: {}", slot, create_err);
                match self.change_slot(slot, true).await {
                    Ok(()) => {
                        self.metrics.record_compensation();
                        info!("Released time slot {} after failed create", slot);
                        Err(AppointmentError::Store(create_err))
                    }
                    Err(compensation) => {
                        error!(
                            incident = "saga_reconciliation_required",
                            doctor_id = %slot.doctor_id,
                            slot_time = %slot.slot_time,
                            "Slot {} is reserved with no appointment: create failed ({}), release failed ({})",
                            slot, create_err, compensation
                        );
                        Err(AppointmentError::CreateFailedCompensationFailed {
                            doctor_id: slot.doctor_id,
                            slot_time: slot.slot_time,
                            create: create_err,
                            compensation,
                        })
                    }
                }
            }
        }
    }

    /// Load -> release -> delete. A failed delete re-reserves the slot.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let result = self.run_cancel(appointment_id).await;
        match &result {
            Ok(()) => {
                self.metrics.record_cancelled();
                info!("Appointment {} cancelled", appointment_id);
            }
            Err(e) => self.metrics.record_failure(e),
        }
        result
    }

    async fn run_cancel(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let appointment = self.store.get_by_id(appointment_id).await.map_err(|e| {
            warn!("Failed to load appointment {} for cancellation: {}", appointment_id, e);
            AppointmentError::from(e)
        })?;
        let slot = appointment.slot();

        self.change_slot(slot, true).await.map_err(|e| {
            error!("Failed to release time slot {}: {}", slot, e);
            AppointmentError::ReleaseFailed(e)
        })?;
        debug!("Time slot {} released", slot);

        match self.store.delete(appointment_id).await {
            Ok(()) => Ok(()),
            Err(delete_err) => {
                error!(
                    "Failed to delete appointment {}, re-reserving slot {}: {}",
                    appointment_id, slot, delete_err
                );
                match self.change_slot(slot, false).await {
                    Ok(()) => {
                        self.metrics.record_compensation();
                        info!("Re-reserved time slot {} after failed delete", slot);
                        Err(AppointmentError::Store(delete_err))
                    }
                    Err(compensation) => {
                        error!(
                            incident = "saga_reconciliation_required",
                            appointment_id = %appointment_id,
                            doctor_id = %slot.doctor_id,
                            slot_time = %slot.slot_time,
                            "Slot {} is free while appointment {} still exists: delete failed ({}), re-reserve failed ({})",
                            slot, appointment_id, delete_err, compensation
                        );
                        Err(AppointmentError::DeleteFailedCompensationFailed {
                            appointment_id,
                            doctor_id: slot.doctor_id,
                            slot_time: slot.slot_time,
                            delete: delete_err,
                            compensation,
                        })
                    }
                }
            }
        }
    }

    // ==========================================================================
    // PASS-THROUGH OPERATIONS (no slot effect)
    // ==========================================================================

    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.store.get_by_id(appointment_id).await?;

        info!(
            "Changing status of appointment {} from {} to {}",
            appointment_id, appointment.status, status
        );
        appointment.status = status;

        let updated = self.store.update(&appointment).await.map_err(|e| {
            error!("Failed to update status of appointment {}: {}", appointment_id, e);
            AppointmentError::from(e)
        })?;
        Ok(updated)
    }

    pub async fn get_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);
        Ok(self.store.get_by_id(appointment_id).await?)
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for user {}", user_id);
        Ok(self.store.list_by_user(user_id).await?)
    }

    pub async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for doctor {}", doctor_id);
        Ok(self.store.list_by_doctor(doctor_id).await?)
    }

    // ==========================================================================
    // REMOTE CALLS
    // ==========================================================================

    async fn remote<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>> + Send,
    {
        tokio::time::timeout(self.remote_timeout, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout(self.remote_timeout)))
    }

    async fn check_slot(&self, slot: SlotRef) -> Result<SlotAvailability, RemoteError> {
        self.remote(self.slots.check_availability(slot)).await
    }

    /// A `success: false` answer counts as a failed call.
    async fn change_slot(&self, slot: SlotRef, available: bool) -> Result<(), RemoteError> {
        if self.remote(self.slots.set_availability(slot, available)).await? {
            Ok(())
        } else {
            Err(RemoteError::Rejected)
        }
    }
}
