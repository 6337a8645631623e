//! # Service Configuration & Constants
//!
//! Every magic number in Meridian lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong.
//!
//! The token *secret* deliberately does not live here. It is supplied at
//! process start (environment or secret file) and injected into the token
//! service — a compiled-in signing secret is a leak with a release tag.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// How long an issued token stays valid. 24 hours, matching the session
/// length clients expect from a ledger API. There is no refresh flow —
/// after expiry the client logs in again.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Token TTL in whole seconds — for claim arithmetic, which wants an i64.
/// Keep this in sync with [`TOKEN_TTL`].
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// The request header that carries the signed token on protected routes.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Minimum acceptable signing-secret length in bytes. HS256 secrets
/// shorter than the hash output weaken the MAC, so 32 is the floor.
pub const TOKEN_SECRET_MIN_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Balance seeded into every freshly registered account, in the smallest
/// currency denomination. Non-zero so a new user can try a transfer
/// without a funding flow.
pub const STARTING_BALANCE: u64 = 10_000;

/// Lower bound of the external account number range. Inclusive.
/// The range spans exactly the 10-digit numbers, so an account number
/// never has a leading zero and always survives a round-trip through
/// decimal formatting.
pub const ACCOUNT_NUMBER_MIN: u64 = 1_000_000_000;

/// Upper bound of the external account number range. Inclusive.
pub const ACCOUNT_NUMBER_MAX: u64 = 9_999_999_999;

/// How many times account creation redraws a random account number after
/// a uniqueness collision before giving up. With nine billion candidate
/// numbers the loop effectively never exhausts, but it must be bounded.
pub const ACCOUNT_NUMBER_MAX_ATTEMPTS: u32 = 8;

/// Minimum credential length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_API_PORT: u16 = 8600;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 8601;

/// Upper bound on total request handling time at the HTTP boundary.
/// The store is embedded and in-process, so this is the only deadline
/// a request needs.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
