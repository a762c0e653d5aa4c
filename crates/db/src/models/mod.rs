//! Row structs.
//!
//! Each submodule holds a `FromRow` struct matching the database row and its
//! conversion into the domain type.

pub mod onboarding_record;
