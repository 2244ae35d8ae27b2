use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use super::AppState;
use crate::constants::{SERVICE_DESCRIPTION, SERVICE_NAME};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub version: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Root descriptor so a browser hit on the service explains itself.
pub async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "description": SERVICE_DESCRIPTION,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "webhook": "POST /webhook"
        }
    }))
}
