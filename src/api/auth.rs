use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::{AppError, AppResult, ExternalError};
use crate::oauth::{LineLoginClient, LineProfile};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Set by LINE when the customer cancels
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub profile: LineProfile,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

fn line_client(state: &AppState) -> AppResult<Arc<LineLoginClient>> {
    state
        .line
        .clone()
        .ok_or_else(|| AppError::configuration("LINE login is not configured"))
}

/// `GET /api/auth/line/login`
pub async fn line_login(State(state): State<AppState>) -> Result<Response, AppError> {
    let client = line_client(&state)?;
    let login_state = Uuid::new_v4().to_string();
    let url = client.authorization_url(&login_state)?;

    info!("Redirecting to LINE login");
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

/// `GET /api/auth/line/callback`
pub async fn line_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<LoginResponse>, AppError> {
    if let Some(error) = query.error {
        return Err(ExternalError::IdentityProvider {
            message: query.error_description.unwrap_or(error),
            status: Some(400),
        }
        .into());
    }

    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::missing_field("code"))?;

    let client = line_client(&state)?;
    let issued_at = Utc::now();
    let (tokens, profile) = client.login(&code).await?;

    Ok(Json(LoginResponse {
        profile,
        expires_in: tokens.expires_in,
        expires_at: tokens.expires_at(issued_at),
    }))
}
