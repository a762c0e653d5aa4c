//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod onboarding_record_repo;

pub use onboarding_record_repo::OnboardingRecordRepo;
