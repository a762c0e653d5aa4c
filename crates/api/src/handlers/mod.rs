//! Request handlers.
//!
//! - [`onboarding`]: record CRUD, patch, submit.
//! - [`wizard`]: entry point, step views, progress.

pub mod onboarding;
pub mod wizard;
