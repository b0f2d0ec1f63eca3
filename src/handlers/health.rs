use crate::config;
use crate::models::HealthResponse;
use axum::Json;
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        service: config::get_config().cloud_service_name.clone(),
        status: "ok".to_string(),
        message: "Hub is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check() -> Json<HealthResponse> {
    debug!("Readiness check requested");
    // All hub state is in-memory, so readiness equals liveness here.
    Json(HealthResponse {
        service: config::get_config().cloud_service_name.clone(),
        status: "ok".to_string(),
        message: "Hub is ready".to_string(),
    })
}
