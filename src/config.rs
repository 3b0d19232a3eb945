use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;

/// Upper bound for `LINE_MAX_RETRIES`
pub const MAX_LINE_RETRIES: u32 = 10;

/// A credential that must never show up in logs or responses.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub slip_provider: SlipProviderConfig,
    pub slip_settings: SlipSettingsSource,
    pub line: Option<LineConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlipProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SlipProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.slipok.com".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Where the slip verification settings record lives
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub enum SlipSettingsSource {
    /// `SLIP_VERIFY_*` environment variables
    Env,
    /// An RPC function on the hosted database
    Remote(RemoteSettingsConfig),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteSettingsConfig {
    pub url: String,
    pub service_key: Secret,
    pub function: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    pub channel_id: String,
    pub channel_secret: Secret,
    pub redirect_uri: String,
    pub api_base_url: String,
    pub auth_base_url: String,
    pub timeout_secs: u64,
    /// Retries for idempotent profile lookups; the token exchange is never retried
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .context("PORT not set")?
                .parse()
                .context("PORT must be a valid number")?,
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        };

        let site = SiteConfig {
            base_url: var("SITE_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
        };

        let defaults = SlipProviderConfig::default();
        let slip_provider = SlipProviderConfig {
            base_url: var("SLIP_PROVIDER_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: match var("SLIP_PROVIDER_TIMEOUT_SECS") {
                Some(raw) => raw
                    .parse()
                    .context("SLIP_PROVIDER_TIMEOUT_SECS must be a valid number")?,
                None => defaults.timeout_secs,
            },
        };

        let slip_settings = match var("SLIP_SETTINGS_SOURCE").as_deref() {
            None | Some("env") => SlipSettingsSource::Env,
            Some("remote") => SlipSettingsSource::Remote(RemoteSettingsConfig {
                url: var("SUPABASE_URL").context("SUPABASE_URL not set")?,
                service_key: Secret::new(
                    var("SUPABASE_SERVICE_ROLE_KEY").context("SUPABASE_SERVICE_ROLE_KEY not set")?,
                ),
                function: var("SLIP_SETTINGS_RPC")
                    .unwrap_or_else(|| "get_slip_verification_settings".to_string()),
            }),
            Some(other) => {
                return Err(anyhow!(
                    "SLIP_SETTINGS_SOURCE must be 'env' or 'remote', got {}",
                    other
                ))
            }
        };

        let line = match var("LINE_CHANNEL_ID") {
            Some(channel_id) => Some(LineConfig {
                channel_id,
                channel_secret: Secret::new(
                    var("LINE_CHANNEL_SECRET").context("LINE_CHANNEL_SECRET not set")?,
                ),
                redirect_uri: var("LINE_REDIRECT_URI").unwrap_or_else(|| {
                    format!(
                        "{}/api/auth/line/callback",
                        site.base_url.trim_end_matches('/')
                    )
                }),
                api_base_url: var("LINE_API_BASE_URL")
                    .unwrap_or_else(|| "https://api.line.me".to_string()),
                auth_base_url: var("LINE_AUTH_BASE_URL")
                    .unwrap_or_else(|| "https://access.line.me".to_string()),
                timeout_secs: var("LINE_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                max_retries: var("LINE_MAX_RETRIES")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            }),
            None => None,
        };

        let config = Config {
            server,
            site,
            slip_provider,
            slip_settings,
            line,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.site.base_url.trim().is_empty() {
            return Err(anyhow!("SITE_URL cannot be empty"));
        }

        if self.slip_provider.base_url.trim().is_empty() {
            return Err(anyhow!("SLIP_PROVIDER_BASE_URL cannot be empty"));
        }

        if self.slip_provider.timeout_secs == 0 {
            return Err(anyhow!("SLIP_PROVIDER_TIMEOUT_SECS must be greater than 0"));
        }

        if let SlipSettingsSource::Remote(remote) = &self.slip_settings {
            if remote.function.trim().is_empty() {
                return Err(anyhow!("SLIP_SETTINGS_RPC cannot be empty"));
            }
        }

        if let Some(line) = &self.line {
            if line.channel_secret.is_empty() {
                return Err(anyhow!("LINE_CHANNEL_SECRET cannot be empty"));
            }
            if line.max_retries > MAX_LINE_RETRIES {
                return Err(anyhow!(
                    "LINE_MAX_RETRIES must be at most {}, got {}",
                    MAX_LINE_RETRIES,
                    line.max_retries
                ));
            }
            if !line.redirect_uri.starts_with("http") {
                return Err(anyhow!(
                    "LINE_REDIRECT_URI must be an absolute URL, got {}",
                    line.redirect_uri
                ));
            }
        }

        Ok(())
    }
}
