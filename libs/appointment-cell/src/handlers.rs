// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AppointmentListResponse, AppointmentResponse, ChangeAppointmentStatusRequest,
    CreateAppointmentRequest,
};
use crate::services::{BookingCoordinator, BookingMetricsSnapshot};

pub async fn create_appointment(
    State(coordinator): State<Arc<BookingCoordinator>>,
    WithRejection(Json(request), _): WithRejection<Json<CreateAppointmentRequest>, AppError>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    let appointment = coordinator.create_appointment(request).await?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

pub async fn cancel_appointment(
    State(coordinator): State<Arc<BookingCoordinator>>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    coordinator.cancel_appointment(appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_appointment(
    State(coordinator): State<Arc<BookingCoordinator>>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let appointment = coordinator.get_by_id(appointment_id).await?;
    Ok(Json(appointment.into()))
}

pub async fn get_user_appointments(
    State(coordinator): State<Arc<BookingCoordinator>>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<AppointmentListResponse>, AppError> {
    let appointments = coordinator.list_by_user(user_id).await?;
    Ok(Json(appointments.into()))
}

pub async fn get_doctor_appointments(
    State(coordinator): State<Arc<BookingCoordinator>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<AppointmentListResponse>, AppError> {
    let appointments = coordinator.list_by_doctor(doctor_id).await?;
    Ok(Json(appointments.into()))
}

pub async fn change_appointment_status(
    State(coordinator): State<Arc<BookingCoordinator>>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<ChangeAppointmentStatusRequest>, AppError>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let appointment = coordinator
        .change_status(appointment_id, request.status)
        .await?;
    Ok(Json(appointment.into()))
}

pub async fn get_saga_metrics(
    State(coordinator): State<Arc<BookingCoordinator>>,
) -> Json<BookingMetricsSnapshot> {
    Json(coordinator.metrics().snapshot())
}
