use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    /// `null` when the settings store could not be reached
    pub slip_verification_configured: Option<bool>,
    pub line_login_configured: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let slip_verification_configured = match state.slip.is_configured().await {
        Ok(configured) => Some(configured),
        Err(e) => {
            warn!("Health check could not load slip settings: {}", e);
            None
        }
    };

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.server.environment.clone(),
        slip_verification_configured,
        line_login_configured: state.line.is_some(),
    };

    Ok(Json(response))
}
