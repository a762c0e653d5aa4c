//! Bearer-token authentication.
//!
//! Tokens are issued by the surrounding sales platform; this service only
//! verifies them. [`jwt::generate_access_token`] exists for tooling and tests.

pub mod jwt;
