use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::{AppError, ValidationError};
use crate::slip::policy::TopupDecision;
use crate::slip::SlipVerificationResult;

#[derive(Debug, Deserialize)]
pub struct VerifySlipRequest {
    /// Text decoded from the slip QR code
    #[serde(default)]
    pub payload: Option<String>,
    /// Amount the customer says they transferred
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct VerifySlipResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub decision: TopupDecision,
    pub result: SlipVerificationResult,
}

/// `POST /api/slip/verify`
///
/// Accepted slips answer 200. Rejections carry the verification result so the
/// client can show what was recognized; when the provider itself answered with
/// an error status, that status is passed through.
pub async fn verify_slip(
    State(state): State<AppState>,
    body: Result<Json<VerifySlipRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(|e| ValidationError::InvalidField {
        field: "body".to_string(),
        message: e.body_text(),
    })?;

    let payload = request
        .payload
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::missing_field("payload"))?;

    let outcome = state.slip.verify_topup(&payload, request.amount).await?;

    let (status, error) = match &outcome.decision {
        TopupDecision::Accepted { .. } => (StatusCode::OK, None),
        TopupDecision::Rejected { reason, .. } => {
            let status = match &outcome.result {
                SlipVerificationResult::Failed {
                    http_status: Some(code),
                    ..
                } => StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_REQUEST),
                _ => StatusCode::BAD_REQUEST,
            };
            (status, Some(reason.to_string()))
        }
    };

    let response = VerifySlipResponse {
        accepted: outcome.decision.is_accepted(),
        error,
        decision: outcome.decision,
        result: outcome.result,
    };

    Ok((status, Json(response)).into_response())
}
