//! Domain logic for the restaurant onboarding wizard.
//!
//! No database or HTTP dependencies live here. Persistence is reached
//! through [`store::RecordStore`], the server through
//! [`backend::WizardBackend`].

pub mod autosave;
pub mod backend;
pub mod error;
pub mod navigation;
pub mod pagination;
pub mod record;
pub mod roles;
pub mod slices;
pub mod status;
pub mod steps;
pub mod store;
pub mod submit;
pub mod types;
pub mod wizard;
