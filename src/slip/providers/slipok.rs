//! SlipOK slip verification provider
//!
//! Submits the QR payload of a Thai bank-transfer slip to SlipOK, which looks
//! the transfer up against bank records and returns the recognized slip.

use crate::config::SlipProviderConfig;
use crate::error::{AppError, AppResult};
use crate::slip::traits::SlipVerifier;
use crate::slip::types::{SlipEnvelope, SlipVerificationRequest, SlipVerificationResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SERVICE: &str = "SlipOK";
const GENERIC_FAILURE: &str = "Slip verification failed";

/// SlipOK verification client
///
/// Holds no credentials; branch id and API key arrive with every call so that
/// settings can be reloaded per attempt.
#[derive(Clone)]
pub struct SlipOkProvider {
    config: SlipProviderConfig,
    client: Client,
}

impl SlipOkProvider {
    pub fn new(config: SlipProviderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, branch_id: &str) -> String {
        format!(
            "{}/api/line/apikey/{}",
            self.config.base_url.trim_end_matches('/'),
            branch_id
        )
    }

    /// Interpret a response the provider did send us.
    ///
    /// Success statuses pass the body through; error statuses become `Failed`
    /// while keeping whatever slip data the body carried.
    fn interpret(status: StatusCode, body: &str) -> AppResult<SlipVerificationResult> {
        if status.is_success() {
            let envelope: SlipEnvelope = serde_json::from_str(body).map_err(|e| {
                error!("Failed to parse {} response: {}", SERVICE, e);
                AppError::invalid_response(SERVICE, e.to_string())
            })?;

            return Ok(match envelope.success {
                Some(true) => SlipVerificationResult::Verified {
                    code: envelope.code,
                    message: envelope.message,
                    data: envelope.data,
                },
                _ => SlipVerificationResult::Failed {
                    code: envelope.code.unwrap_or(i64::from(status.as_u16())),
                    message: non_empty(envelope.message),
                    data: envelope.data,
                    http_status: None,
                },
            });
        }

        let envelope = match serde_json::from_str::<SlipEnvelope>(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("{} error body was not usable JSON: {}", SERVICE, e);
                SlipEnvelope::default()
            }
        };

        Ok(SlipVerificationResult::Failed {
            code: envelope.code.unwrap_or(i64::from(status.as_u16())),
            message: non_empty(envelope.message),
            data: envelope.data,
            http_status: Some(status.as_u16()),
        })
    }
}

fn slip_field(data: Option<&serde_json::Value>, key: &str) -> String {
    match data.and_then(|d| d.get(key)) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn non_empty(message: Option<String>) -> String {
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

#[async_trait]
impl SlipVerifier for SlipOkProvider {
    async fn verify(
        &self,
        qr_payload: &str,
        branch_id: &str,
        api_key: &str,
        amount: Option<f64>,
    ) -> AppResult<SlipVerificationResult> {
        info!(
            "Submitting slip to {}: payload_len={}, amount={:?}",
            SERVICE,
            qr_payload.len(),
            amount
        );

        let request = SlipVerificationRequest::new(qr_payload, amount);

        let response = self
            .client
            .post(self.endpoint(branch_id))
            .header("Content-Type", "application/json")
            .header("x-authorization", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the branch id.
                let e = e.without_url();
                error!("{} request failed: {}", SERVICE, e);
                AppError::transport(SERVICE, &e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to read {} response body: {}", SERVICE, e);
            AppError::transport(SERVICE, &e)
        })?;

        let result = Self::interpret(status, &body)?;

        match &result {
            SlipVerificationResult::Verified { data, .. } => info!(
                "{} verified slip: trans_ref={}, amount={}",
                SERVICE,
                slip_field(data.as_ref(), "transRef"),
                slip_field(data.as_ref(), "amount")
            ),
            SlipVerificationResult::Failed { code, message, data, .. } => warn!(
                "{} rejected slip: status={}, code={}, message={}, has_data={}",
                SERVICE,
                status,
                code,
                message,
                data.is_some()
            ),
        }

        Ok(result)
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}
