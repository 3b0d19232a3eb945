//! Top-up verification flow
//!
//! Loads the current settings, applies the pre-call checks, submits the slip
//! and runs the acceptance policy on what comes back.

use crate::error::{AppError, AppResult};
use crate::slip::policy::{self, TopupDecision};
use crate::slip::traits::{SlipSettingsProvider, SlipVerifier};
use crate::slip::types::SlipVerificationResult;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Verification result plus what the shop makes of it
#[derive(Debug, Clone, Serialize)]
pub struct TopupVerification {
    pub decision: TopupDecision,
    pub result: SlipVerificationResult,
}

#[derive(Clone)]
pub struct SlipVerificationService {
    settings: Arc<dyn SlipSettingsProvider>,
    verifier: Arc<dyn SlipVerifier>,
}

impl SlipVerificationService {
    pub fn new(settings: Arc<dyn SlipSettingsProvider>, verifier: Arc<dyn SlipVerifier>) -> Self {
        Self { settings, verifier }
    }

    /// Whether a settings record with credentials is available right now
    pub async fn is_configured(&self) -> AppResult<bool> {
        Ok(self
            .settings
            .load_slip_settings()
            .await?
            .is_some_and(|settings| settings.has_credentials()))
    }

    /// Verify a slip submitted for a top-up.
    ///
    /// `amount`, when given, is the amount the customer claims to have sent;
    /// it is checked against the floor and forwarded so the provider enforces it.
    pub async fn verify_topup(
        &self,
        qr_payload: &str,
        amount: Option<f64>,
    ) -> AppResult<TopupVerification> {
        if qr_payload.trim().is_empty() {
            return Err(AppError::missing_field("payload"));
        }

        let settings = self
            .settings
            .load_slip_settings()
            .await?
            .filter(|s| s.has_credentials())
            .ok_or_else(|| AppError::configuration("Slip verification settings are not configured"))?;

        policy::check_active(&settings)?;

        if let Some(amount) = amount {
            policy::check_minimum(&settings, amount)?;
        }

        let result = self
            .verifier
            .verify(
                qr_payload,
                settings.branch_id.expose(),
                settings.api_key.expose(),
                amount,
            )
            .await?;

        let decision = policy::evaluate(&settings, &result);
        match &decision {
            TopupDecision::Accepted { amount, account } => info!(
                "Top-up slip accepted via {}: amount={}, account={}",
                self.verifier.name(),
                amount,
                account.account_name
            ),
            TopupDecision::Rejected { reason, .. } => {
                warn!("Top-up slip rejected via {}: {}", self.verifier.name(), reason)
            }
        }

        Ok(TopupVerification { decision, result })
    }
}
