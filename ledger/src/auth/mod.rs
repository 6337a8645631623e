//! # Authentication
//!
//! Two independent concerns:
//!
//! - **password** — Argon2id credential hashing and verification.
//! - **token** — issuing and validating the signed, time-boxed token
//!   that binds a caller to an account number on protected requests.
//!
//! Tokens are stateless: nothing is persisted server-side, so there is
//! no revocation. Acceptable here — the TTL is the only kill switch.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenError, TokenService};
