//! Slip verification trait definitions
//!
//! The verifier talks to the slip-checking provider; the settings provider
//! supplies the credentials and policy it runs under. Keeping them apart lets
//! the client stay free of any database dependency.

use crate::error::AppResult;
use crate::slip::types::{SlipVerificationResult, SlipVerificationSettings};
use async_trait::async_trait;

/// A slip-checking provider
#[async_trait]
pub trait SlipVerifier: Send + Sync {
    /// Submit one QR payload for verification
    ///
    /// Issues exactly one outbound call. A response with an error status is
    /// returned as [`SlipVerificationResult::Failed`], not as `Err`; `Err` means
    /// no usable response was obtained.
    ///
    /// # Arguments
    /// * `qr_payload` - Raw text decoded from the slip QR code, passed through untouched
    /// * `branch_id` - Provider branch scoping the call
    /// * `api_key` - Provider API key, sent as a header only
    /// * `amount` - When set, the provider enforces the transfer amount itself
    async fn verify(
        &self,
        qr_payload: &str,
        branch_id: &str,
        api_key: &str,
        amount: Option<f64>,
    ) -> AppResult<SlipVerificationResult>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Source of [`SlipVerificationSettings`]
///
/// Called once per verification attempt; implementations must not cache.
#[async_trait]
pub trait SlipSettingsProvider: Send + Sync {
    /// `Ok(None)` when no settings record exists yet
    async fn load_slip_settings(&self) -> AppResult<Option<SlipVerificationSettings>>;
}
