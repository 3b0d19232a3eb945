//! Slip verification provider implementations

pub mod slipok;

pub use slipok::SlipOkProvider;
