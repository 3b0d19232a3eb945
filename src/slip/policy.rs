//! Top-up acceptance policy
//!
//! The provider only tells us whether a slip is a real transfer. Whether it
//! funds a top-up here is decided by the merchant's settings: verification
//! must be switched on, the amount must reach the floor, and the money must
//! have landed in one of the merchant's own accounts.

use crate::error::{AppResult, DomainError, ValidationError};
use crate::slip::types::{BankAccount, SlipData, SlipVerificationResult, SlipVerificationSettings};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Shortest run of visible digits we trust when account lengths differ
const MIN_VISIBLE_DIGITS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The provider did not confirm the slip
    ProviderRejected { code: i64, message: String },
    /// Confirmed, but without a slip record we can read
    MissingSlipData,
    BelowMinimum { amount: f64, minimum: f64 },
    /// Paid into an account the merchant does not control
    ReceivingAccountMismatch {
        receiving_bank: String,
        receiving_account: Option<String>,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::ProviderRejected { code, message } => {
                write!(f, "Slip rejected by provider ({}): {}", code, message)
            }
            RejectionReason::MissingSlipData => {
                write!(f, "Provider returned no slip details")
            }
            RejectionReason::BelowMinimum { amount, minimum } => write!(
                f,
                "Transfer amount {} is below the minimum top-up amount of {}",
                amount, minimum
            ),
            RejectionReason::ReceivingAccountMismatch { .. } => {
                write!(f, "Transfer was not made to a registered shop account")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TopupDecision {
    Accepted { amount: f64, account: BankAccount },
    /// Carries the provider code and slip record, when there were any, so a
    /// near-match (e.g. code 1013) can still be reviewed.
    Rejected {
        reason: RejectionReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
}

impl TopupDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TopupDecision::Accepted { .. })
    }
}

/// Inactive settings must short-circuit before any provider call.
pub fn check_active(settings: &SlipVerificationSettings) -> AppResult<()> {
    if !settings.is_active {
        return Err(DomainError::SlipVerificationDisabled.into());
    }
    Ok(())
}

/// The floor is inclusive.
pub fn check_minimum(settings: &SlipVerificationSettings, amount: f64) -> AppResult<()> {
    if amount < settings.minimum_topup_amount {
        return Err(ValidationError::BelowMinimumAmount {
            amount,
            minimum: settings.minimum_topup_amount,
        }
        .into());
    }
    Ok(())
}

fn separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[^0-9xX]").expect("static pattern"))
}

/// Compare a configured account number with the (usually masked) value on a
/// slip such as `xxx-x-x5366-x`. Masked positions match anything, visible
/// digits must agree.
pub fn account_matches(configured: &str, slip_value: &str) -> bool {
    let configured: Vec<char> = separators()
        .replace_all(configured, "")
        .chars()
        .collect();
    let slip: Vec<char> = separators()
        .replace_all(slip_value, "")
        .chars()
        .collect();

    let visible: String = slip.iter().filter(|c| c.is_ascii_digit()).collect();
    if visible.is_empty() || configured.is_empty() {
        return false;
    }

    if configured.len() == slip.len() {
        return configured
            .iter()
            .zip(slip.iter())
            .all(|(c, s)| !s.is_ascii_digit() || c == s);
    }

    let configured: String = configured.into_iter().collect();
    visible.len() >= MIN_VISIBLE_DIGITS && configured.contains(&visible)
}

/// The merchant account the slip was paid into, if any
pub fn match_receiving_account<'a>(
    settings: &'a SlipVerificationSettings,
    slip: &SlipData,
) -> Option<&'a BankAccount> {
    let slip_account = slip.receiver.account.as_ref()?;
    settings.bank_accounts.iter().find(|account| {
        let same_bank = slip.receiving_bank.trim().is_empty()
            || account.bank_code.trim() == slip.receiving_bank.trim();
        same_bank && account_matches(&account.account_no, &slip_account.value)
    })
}

fn read_slip(raw: &serde_json::Value) -> Option<SlipData> {
    match SlipData::from_value(raw) {
        Ok(slip) => Some(slip),
        Err(e) => {
            warn!("Provider slip record could not be read: {}", e);
            None
        }
    }
}

/// Decide whether a verification result funds a top-up.
pub fn evaluate(
    settings: &SlipVerificationSettings,
    result: &SlipVerificationResult,
) -> TopupDecision {
    let rejected = |reason: RejectionReason| TopupDecision::Rejected {
        reason,
        code: result.code(),
        data: result.data().cloned(),
    };

    let raw = match result {
        SlipVerificationResult::Failed { code, message, .. } => {
            return rejected(RejectionReason::ProviderRejected {
                code: *code,
                message: message.clone(),
            })
        }
        SlipVerificationResult::Verified { data, .. } => data,
    };

    let Some(data) = raw.as_ref().and_then(read_slip) else {
        return rejected(RejectionReason::MissingSlipData);
    };

    if data.amount < settings.minimum_topup_amount {
        return rejected(RejectionReason::BelowMinimum {
            amount: data.amount,
            minimum: settings.minimum_topup_amount,
        });
    }

    match match_receiving_account(settings, &data) {
        Some(account) => TopupDecision::Accepted {
            amount: data.amount,
            account: account.clone(),
        },
        None => rejected(RejectionReason::ReceivingAccountMismatch {
            receiving_bank: data.receiving_bank.clone(),
            receiving_account: data.receiver.account.as_ref().map(|a| a.value.clone()),
        }),
    }
}
