// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::services::BookingCoordinator;

pub fn appointment_routes(coordinator: Arc<BookingCoordinator>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/saga/metrics", get(handlers::get_saga_metrics))
        .route("/user/{user_id}", get(handlers::get_user_appointments))
        .route("/doctor/{doctor_id}", get(handlers::get_doctor_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::cancel_appointment),
        )
        .route("/{appointment_id}/status", patch(handlers::change_appointment_status))
        .with_state(coordinator)
}
