//! HTTP surface
//!
//! Thin axum handlers over the slip verification service and the LINE login
//! client. Errors are always answered as `{"error": "..."}`.

pub mod auth;
pub mod banks;
pub mod error;
pub mod health;
pub mod slip;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{Config, SlipSettingsSource};
use crate::error::AppResult;
use crate::oauth::LineLoginClient;
use crate::slip::providers::SlipOkProvider;
use crate::slip::settings::{EnvSlipSettings, RemoteSlipSettings};
use crate::slip::{SlipSettingsProvider, SlipVerificationService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub slip: SlipVerificationService,
    pub line: Option<Arc<LineLoginClient>>,
}

impl AppState {
    pub fn new(
        config: Config,
        slip: SlipVerificationService,
        line: Option<LineLoginClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            slip,
            line: line.map(Arc::new),
        }
    }

    /// Wire up the production collaborators described by `config`.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let settings: Arc<dyn SlipSettingsProvider> = match &config.slip_settings {
            SlipSettingsSource::Env => Arc::new(EnvSlipSettings::new()),
            SlipSettingsSource::Remote(remote) => Arc::new(RemoteSlipSettings::new(remote.clone())?),
        };
        let verifier = Arc::new(SlipOkProvider::new(config.slip_provider.clone())?);
        let slip = SlipVerificationService::new(settings, verifier);

        let line = match &config.line {
            Some(line) => Some(LineLoginClient::new(line.clone())?),
            None => None,
        };

        Ok(Self::new(config, slip, line))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/banks", get(banks::list_banks))
        .route("/api/banks/:code", get(banks::bank_name))
        .route("/api/slip/verify", post(slip::verify_slip))
        .route("/api/auth/line/login", get(auth::line_login))
        .route("/api/auth/line/callback", get(auth::line_callback))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
