//! Application error types
//!
//! Every fallible operation in the crate returns [`AppResult`]. The kinds mirror
//! how a failure should be surfaced: caller input problems, business rules,
//! upstream providers, and missing infrastructure/configuration.

use std::fmt;
use thiserror::Error;

/// Result type used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Problems with what the caller sent us
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: String },

    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Amount {amount} is below the minimum top-up amount of {minimum}")]
    BelowMinimumAmount { amount: f64, minimum: f64 },
}

/// Business rules that refuse an otherwise well-formed request
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("Slip verification is currently disabled")]
    SlipVerificationDisabled,
}

/// Failures talking to third-party services
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExternalError {
    /// The service answered with a non-success status
    #[error("{service} returned HTTP {status}: {message}")]
    Provider {
        service: String,
        status: u16,
        message: String,
    },

    /// No response was obtained (connect error, timeout, broken stream)
    #[error("{service} request failed: {message}")]
    Transport {
        service: String,
        message: String,
        is_timeout: bool,
    },

    /// A response arrived but its body could not be understood
    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse { service: String, message: String },

    /// The identity provider refused a login step
    #[error("{message}")]
    IdentityProvider { message: String, status: Option<u16> },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InfrastructureError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppErrorKind {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    External(#[from] ExternalError),

    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        InfrastructureError::Configuration {
            message: message.into(),
        }
        .into()
    }

    pub fn internal(message: impl Into<String>) -> Self {
        InfrastructureError::Internal {
            message: message.into(),
        }
        .into()
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        ValidationError::MissingField {
            field: field.into(),
        }
        .into()
    }

    pub fn transport(service: impl Into<String>, err: &reqwest::Error) -> Self {
        ExternalError::Transport {
            service: service.into(),
            message: err.to_string(),
            is_timeout: err.is_timeout(),
        }
        .into()
    }

    pub fn invalid_response(service: impl Into<String>, message: impl Into<String>) -> Self {
        ExternalError::InvalidResponse {
            service: service.into(),
            message: message.into(),
        }
        .into()
    }

    /// Transport failures and upstream 5xx are worth another attempt for
    /// idempotent calls; everything else is final.
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::External(ExternalError::Transport { .. }) => true,
            AppErrorKind::External(ExternalError::Provider { status, .. }) => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status a handler should answer with for this error
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Validation(_) => 400,
            AppErrorKind::Domain(DomainError::SlipVerificationDisabled) => 503,
            AppErrorKind::External(ExternalError::Provider { status, .. }) => *status,
            AppErrorKind::External(ExternalError::IdentityProvider { status, .. }) => {
                status.unwrap_or(500)
            }
            AppErrorKind::External(_) => 500,
            AppErrorKind::Infrastructure(_) => 500,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{} ({})", self.kind, context)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for AppError {}

impl From<AppErrorKind> for AppError {
    fn from(kind: AppErrorKind) -> Self {
        AppError::new(kind)
    }
}

macro_rules! impl_from_kind {
    ($($source:ty),*) => {
        $(
            impl From<$source> for AppError {
                fn from(err: $source) -> Self {
                    AppError::new(err.into())
                }
            }
        )*
    };
}

impl_from_kind!(ValidationError, DomainError, ExternalError, InfrastructureError);
