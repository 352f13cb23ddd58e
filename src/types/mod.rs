//! Shared types for Bursar

mod error;

pub use error::{BursarError, Result};

/// Tokens granted to a user on first verified sign-in
pub const DEFAULT_TOKEN_BALANCE: i64 = 100;

/// Balance assigned to auto-provisioned admin accounts
pub const ADMIN_TOKEN_BALANCE: i64 = 999_999_999;
