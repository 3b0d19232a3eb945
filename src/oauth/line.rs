//! LINE Login client
//!
//! Authorization-code flow: redirect the customer to LINE, exchange the code
//! that comes back for tokens, then read the profile with the access token.

use crate::config::{LineConfig, Secret};
use crate::error::{AppError, AppResult, ExternalError};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SERVICE: &str = "LINE";
const SCOPE: &str = "profile openid email";
const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 5_000;

/// Exponential delay before retry `attempt` (0-based), capped
fn backoff_delay(attempt: u32) -> Duration {
    let millis = BASE_BACKOFF_MS
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(millis)
}

/// Tokens issued for one login
#[derive(Clone)]
pub struct LineTokens {
    pub access_token: Secret,
    pub refresh_token: Secret,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub id_token: Option<Secret>,
}

impl LineTokens {
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + ChronoDuration::seconds(self.expires_in)
    }
}

impl fmt::Debug for LineTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineTokens")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProfile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    email: Option<String>,
}

/// LINE requires the redirect URI to match the registered value exactly; the
/// registration has no trailing slash.
pub fn normalize_redirect_uri(uri: &str) -> &str {
    uri.strip_suffix('/').unwrap_or(uri)
}

pub struct LineLoginClient {
    config: LineConfig,
    client: Client,
}

impl LineLoginClient {
    pub fn new(config: LineConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(
            "LINE login client initialized: channel_id={}, redirect_uri={}",
            config.channel_id,
            normalize_redirect_uri(&config.redirect_uri)
        );

        Ok(Self { config, client })
    }

    pub fn redirect_uri(&self) -> &str {
        normalize_redirect_uri(&self.config.redirect_uri)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    /// Where to send the customer to start a login
    pub fn authorization_url(&self, state: &str) -> AppResult<String> {
        let base = format!(
            "{}/oauth2/v2.1/authorize",
            self.config.auth_base_url.trim_end_matches('/')
        );
        let url = Url::parse_with_params(
            &base,
            &[
                ("response_type", "code"),
                ("client_id", self.config.channel_id.as_str()),
                ("redirect_uri", self.redirect_uri()),
                ("state", state),
                ("scope", SCOPE),
            ],
        )
        .map_err(|e| AppError::configuration(format!("Invalid LINE authorize URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Codes are single use, so this is never retried.
    pub async fn exchange_code(&self, code: &str) -> AppResult<LineTokens> {
        if code.trim().is_empty() {
            return Err(AppError::missing_field("code"));
        }

        debug!("Exchanging LINE authorization code");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri()),
            ("client_id", self.config.channel_id.as_str()),
            ("client_secret", self.config.channel_secret.expose()),
        ];

        let response = self
            .client
            .post(self.api_url("/oauth2/v2.1/token"))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("LINE token request failed: {}", e);
                AppError::transport(SERVICE, &e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::transport(SERVICE, &e))?;

        if !status.is_success() {
            let detail: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            let message = detail
                .error_description
                .or(detail.error)
                .unwrap_or_else(|| "Failed to exchange authorization code".to_string());
            error!("LINE token exchange failed: status={}, message={}", status, message);
            return Err(ExternalError::IdentityProvider {
                message,
                status: Some(status.as_u16()),
            }
            .into());
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse LINE token response: {}", e);
            AppError::invalid_response(SERVICE, e.to_string())
        })?;

        info!("LINE token issued: expires_in={}s", token.expires_in);

        Ok(LineTokens {
            access_token: Secret::new(token.access_token),
            refresh_token: Secret::new(token.refresh_token),
            expires_in: token.expires_in,
            id_token: token.id_token.map(Secret::new),
        })
    }

    async fn get_profile_once(&self, access_token: &str) -> AppResult<LineProfile> {
        let response = self
            .client
            .get(self.api_url("/v2/profile"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalError::Provider {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                message: if body.is_empty() {
                    "Failed to fetch profile".to_string()
                } else {
                    body
                },
            }
            .into());
        }

        response.json::<LineProfile>().await.map_err(|e| {
            error!("Failed to parse LINE profile: {}", e);
            AppError::invalid_response(SERVICE, e.to_string())
        })
    }

    /// Fetch the profile, retrying transport errors and upstream 5xx.
    pub async fn fetch_profile(&self, access_token: &str) -> AppResult<LineProfile> {
        let mut attempt = 0;
        loop {
            match self.get_profile_once(access_token).await {
                Ok(profile) => return Ok(profile),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let backoff = backoff_delay(attempt);
                    warn!(
                        "LINE profile request failed, retrying after {}ms (attempt {}): {}",
                        backoff.as_millis(),
                        attempt + 1,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("LINE profile request failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn get_email(&self, access_token: &str) -> AppResult<Option<String>> {
        let response = self
            .client
            .get(self.api_url("/v2/oauth2/v2.1/userinfo"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::transport(SERVICE, &e))?;

        if response.status() != StatusCode::OK {
            return Err(ExternalError::Provider {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
                message: "userinfo unavailable".to_string(),
            }
            .into());
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::invalid_response(SERVICE, e.to_string()))?;
        Ok(info.email.filter(|e| !e.trim().is_empty()))
    }

    /// Email is only present when the customer granted the scope; any failure
    /// here yields `None`.
    pub async fn fetch_email(&self, access_token: &str) -> Option<String> {
        match self.get_email(access_token).await {
            Ok(email) => email,
            Err(e) => {
                debug!("LINE email lookup skipped: {}", e);
                None
            }
        }
    }

    /// Profile with email filled in when available
    pub async fn fetch_user(&self, access_token: &str) -> AppResult<LineProfile> {
        let mut profile = self.fetch_profile(access_token).await?;
        if profile.email.is_none() {
            profile.email = self.fetch_email(access_token).await;
        }
        Ok(profile)
    }

    /// Full callback handling: code → tokens → profile
    pub async fn login(&self, code: &str) -> AppResult<(LineTokens, LineProfile)> {
        let tokens = self.exchange_code(code).await?;
        let profile = self.fetch_user(tokens.access_token.expose()).await?;
        info!("LINE login completed for user {}", profile.user_id);
        Ok((tokens, profile))
    }
}
