use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use appointment_cell::BookingCoordinator;

pub fn create_router(coordinator: Arc<BookingCoordinator>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .route("/health", get(health))
        .nest("/appointments", appointment_routes(coordinator))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
