//! Slip verification types and data structures
//!
//! Wire contracts of the slip-checking provider plus the settings record that
//! drives verification.

use crate::banks;
use crate::config::Secret;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Provider error codes that still return the recognized slip
pub const CODES_WITH_SLIP_DATA: [i64; 3] = [1012, 1013, 1014];

/// Receiving account the merchant controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    #[serde(alias = "account_name")]
    pub account_name: String,
    #[serde(alias = "account_no")]
    pub account_no: String,
    #[serde(alias = "bank_code")]
    pub bank_code: String,
}

impl BankAccount {
    pub fn bank_name(&self) -> &str {
        banks::name_of(&self.bank_code)
    }
}

/// Configuration for the active verification provider
///
/// Loaded fresh for every verification attempt. Credentials are held as
/// [`Secret`]s so `Debug` output is safe to log.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipVerificationSettings {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(alias = "branch_id")]
    pub branch_id: Secret,
    #[serde(alias = "api_key")]
    pub api_key: Secret,
    #[serde(alias = "minimum_topup_amount", default)]
    pub minimum_topup_amount: f64,
    #[serde(alias = "bank_accounts", default)]
    pub bank_accounts: Vec<BankAccount>,
    #[serde(alias = "is_active", default)]
    pub is_active: bool,
}

fn default_provider() -> String {
    "slipok".to_string()
}

impl SlipVerificationSettings {
    pub fn has_credentials(&self) -> bool {
        !self.branch_id.is_empty() && !self.api_key.is_empty()
    }
}

impl fmt::Debug for SlipVerificationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlipVerificationSettings")
            .field("provider", &self.provider)
            .field("branch_id", &self.branch_id)
            .field("api_key", &self.api_key)
            .field("minimum_topup_amount", &self.minimum_topup_amount)
            .field("bank_accounts", &self.bank_accounts.len())
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Outbound request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlipVerificationRequest {
    /// Raw text decoded from the slip QR code
    pub data: String,
    pub log: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl SlipVerificationRequest {
    pub fn new(qr_payload: impl Into<String>, amount: Option<f64>) -> Self {
        Self {
            data: qr_payload.into(),
            log: true,
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlipAccount {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipParty {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account: Option<SlipAccount>,
}

/// Typed view over the slip the provider recognized
///
/// Only the fields the top-up policy reads. The provider's own record is
/// carried untouched in [`SlipVerificationResult`]; this view is parsed from
/// it on demand and may fail where the raw record does not.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipData {
    #[serde(default)]
    pub sender: SlipParty,
    #[serde(default)]
    pub receiver: SlipParty,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sending_bank: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub receiving_bank: String,
    #[serde(default)]
    pub trans_ref: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trans_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trans_time: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub ref1: Option<String>,
    #[serde(default)]
    pub ref2: Option<String>,
    #[serde(default)]
    pub ref3: Option<String>,
}

impl SlipData {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        SlipData::deserialize(value)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Amounts occasionally arrive as strings such as "99.00".
fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(0.0),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("amount out of range")),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .replace(',', "")
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid amount: {}", s))),
        Some(other) => Err(de::Error::custom(format!("invalid amount: {}", other))),
    }
}

/// Normalized verification outcome
///
/// Serializes to `{success, code?, message?, data}`, where `data` is the
/// provider's record exactly as received. A failed verification may still
/// carry the recognized slip (see [`CODES_WITH_SLIP_DATA`]).
#[derive(Debug, Clone, PartialEq)]
pub enum SlipVerificationResult {
    Verified {
        code: Option<i64>,
        message: Option<String>,
        data: Option<serde_json::Value>,
    },
    Failed {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
        /// HTTP status of the provider response, when it was not a success
        http_status: Option<u16>,
    },
}

impl SlipVerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SlipVerificationResult::Verified { .. })
    }

    /// The provider's slip record, unmodified
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            SlipVerificationResult::Verified { data, .. } => data.as_ref(),
            SlipVerificationResult::Failed { data, .. } => data.as_ref(),
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            SlipVerificationResult::Verified { code, .. } => *code,
            SlipVerificationResult::Failed { code, .. } => Some(*code),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SlipVerificationResult::Verified { message, .. } => message.as_deref(),
            SlipVerificationResult::Failed { message, .. } => Some(message),
        }
    }
}

/// Provider response body, every field optional
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SlipEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// `null` or absent becomes `None`; anything else is kept as sent
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

// Codes occasionally arrive as strings.
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Serialize)]
struct WireResult<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    data: Option<&'a serde_json::Value>,
}

impl Serialize for SlipVerificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireResult {
            success: self.is_success(),
            code: self.code(),
            message: self.message(),
            data: self.data(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SlipVerificationResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = SlipEnvelope::deserialize(deserializer)?;
        Ok(match envelope.success {
            Some(true) => SlipVerificationResult::Verified {
                code: envelope.code,
                message: envelope.message,
                data: envelope.data,
            },
            _ => SlipVerificationResult::Failed {
                code: envelope.code.unwrap_or_default(),
                message: envelope.message.unwrap_or_default(),
                data: envelope.data,
                http_status: None,
            },
        })
    }
}
