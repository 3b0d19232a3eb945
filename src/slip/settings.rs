//! Slip verification settings stores
//!
//! Two sources: `SLIP_VERIFY_*` environment variables for simple deployments,
//! and an RPC function on the hosted database where the admin dashboard keeps
//! the record. Neither caches; every call reads the current record.

use crate::config::{RemoteSettingsConfig, Secret};
use crate::error::{AppError, AppResult};
use crate::slip::traits::SlipSettingsProvider;
use crate::slip::types::{BankAccount, SlipVerificationSettings};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

const ENV_PREFIX: &str = "SLIP_VERIFY";

/// Settings read from `SLIP_VERIFY_*` variables
///
/// `BANK_ACCOUNTS` holds a JSON array of `{accountName, accountNo, bankCode}`.
#[derive(Debug, Clone, Default)]
pub struct EnvSlipSettings {
    source: Option<config::Map<String, String>>,
}

impl EnvSlipSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from the given variables instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn read(&self) -> AppResult<Option<SlipVerificationSettings>> {
        let raw = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(self.source.clone()))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to read slip settings: {}", e)))?;

        let string = |key: &str| raw.get_string(key).ok().filter(|v| !v.trim().is_empty());

        let (branch_id, api_key) = match (string("branch_id"), string("api_key")) {
            (Some(branch_id), Some(api_key)) => (branch_id, api_key),
            _ => return Ok(None),
        };

        let minimum_topup_amount = match string("minimum_topup_amount") {
            Some(value) => value.trim().parse::<f64>().map_err(|_| {
                AppError::configuration(format!(
                    "{}_MINIMUM_TOPUP_AMOUNT must be a number, got {}",
                    ENV_PREFIX, value
                ))
            })?,
            None => 0.0,
        };

        let is_active = match string("is_active") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                AppError::configuration(format!(
                    "{}_IS_ACTIVE must be true or false, got {}",
                    ENV_PREFIX, value
                ))
            })?,
            None => true,
        };

        let bank_accounts: Vec<BankAccount> = match string("bank_accounts") {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                AppError::configuration(format!(
                    "{}_BANK_ACCOUNTS must be a JSON array of accounts: {}",
                    ENV_PREFIX, e
                ))
            })?,
            None => Vec::new(),
        };

        Ok(Some(SlipVerificationSettings {
            provider: string("provider").unwrap_or_else(|| "slipok".to_string()),
            branch_id: Secret::new(branch_id),
            api_key: Secret::new(api_key),
            minimum_topup_amount,
            bank_accounts,
            is_active,
        }))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl SlipSettingsProvider for EnvSlipSettings {
    async fn load_slip_settings(&self) -> AppResult<Option<SlipVerificationSettings>> {
        let settings = self.read()?;
        debug!("Loaded slip settings from environment: {:?}", settings);
        Ok(settings)
    }
}

/// Settings returned by a hosted-database RPC function
pub struct RemoteSlipSettings {
    config: RemoteSettingsConfig,
    client: Client,
}

impl RemoteSlipSettings {
    pub fn new(config: RemoteSettingsConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(
            "Remote slip settings store configured: url={}, function={}",
            config.url, config.function
        );

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/rpc/{}",
            self.config.url.trim_end_matches('/'),
            self.config.function
        )
    }
}

/// The RPC may answer with a row, a one-row array, or null.
fn settings_from_rpc(value: serde_json::Value) -> AppResult<Option<SlipVerificationSettings>> {
    let record = match value {
        serde_json::Value::Array(rows) => rows.into_iter().next(),
        serde_json::Value::Null => None,
        other => Some(other),
    };

    match record {
        Some(serde_json::Value::Null) | None => Ok(None),
        Some(record) => serde_json::from_value(record).map(Some).map_err(|e| {
            AppError::invalid_response("Settings store", format!("Malformed settings record: {}", e))
        }),
    }
}

#[async_trait]
impl SlipSettingsProvider for RemoteSlipSettings {
    async fn load_slip_settings(&self) -> AppResult<Option<SlipVerificationSettings>> {
        let key = self.config.service_key.expose();

        let response = self
            .client
            .post(self.endpoint())
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| {
                error!("Settings store request failed: {}", e);
                AppError::transport("Settings store", &e)
            })?;

        let status = response.status();
        if !status.is_success() {
            // The body may echo credentials or row contents.
            error!("Settings store returned HTTP {}", status);
            return Err(AppError::internal(format!(
                "Settings store returned HTTP {}",
                status.as_u16()
            )));
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            error!("Failed to parse settings store response: {}", e);
            AppError::invalid_response("Settings store", e.to_string())
        })?;

        let settings = settings_from_rpc(value)?;
        debug!("Loaded slip settings from settings store: {:?}", settings);
        Ok(settings)
    }
}
