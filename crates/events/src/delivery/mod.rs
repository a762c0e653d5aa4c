//! External delivery channels for submission notifications.

pub mod email;
pub mod webhook;
