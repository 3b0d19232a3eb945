//! Storefront backend: bank-transfer slip verification for top-ups and LINE
//! customer login.

pub mod banks;
pub mod config;
pub mod error;
pub mod oauth;
pub mod slip;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod telemetry;
