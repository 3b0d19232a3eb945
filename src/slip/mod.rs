//! Bank-transfer slip verification
//!
//! Customers top up by transferring money and submitting the QR code printed
//! on their transfer slip. The slip is checked against real bank records by a
//! provider, then accepted or rejected under the shop's own settings.

pub mod policy;
pub mod providers;
pub mod service;
pub mod settings;
pub mod traits;
pub mod types;

pub use service::{SlipVerificationService, TopupVerification};
pub use traits::{SlipSettingsProvider, SlipVerifier};
pub use types::{SlipData, SlipVerificationResult, SlipVerificationSettings};
