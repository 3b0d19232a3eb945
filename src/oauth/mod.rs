//! Customer login through third-party identity providers

pub mod line;

pub use line::{normalize_redirect_uri, LineLoginClient, LineProfile, LineTokens};
