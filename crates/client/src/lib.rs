//! HTTP client for the onboarding API.
//!
//! [`RestBackend`] implements [`WizardBackend`](bistro_core::backend::WizardBackend)
//! so a Step Controller and its auto-save engines can run against a remote
//! server exactly as they run in process.

pub mod config;
pub mod error;
pub mod rest;

pub use config::ClientConfig;
pub use error::ClientError;
pub use rest::RestBackend;
