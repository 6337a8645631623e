//! # Error Taxonomy
//!
//! The five failure kinds the service distinguishes, end to end. Module
//! internals use their own narrow error types (`StoreError`,
//! `TokenError`, ...) and convert into [`LedgerError`] at the component
//! boundary, so the HTTP layer renders kind + message without ever
//! pattern-matching on storage internals.
//!
//! Every variant maps to a stable machine-readable `kind()` string that
//! the API serializes next to the human-readable message — API consumers
//! get a field to switch on instead of parsing prose.

use thiserror::Error;

use crate::auth::token::TokenError;
use crate::store::db::StoreError;

/// Errors surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The request itself is malformed: bad id, empty name, zero amount,
    /// short password. Never the system's fault.
    #[error("{0}")]
    Validation(String),

    /// No row matched the given id or account number.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The presented token is missing, expired, tampered with, or signed
    /// with the wrong algorithm.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// The sender cannot cover the requested amount. A domain outcome,
    /// not a system fault — rendered with a human-readable payload.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The sender's balance at check time.
        available: u64,
        /// The amount the transfer asked for.
        requested: u64,
    },

    /// The storage engine failed or a constraint was violated.
    #[error("storage error: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Stable machine-readable error kind, serialized in the HTTP error
    /// envelope. Renaming one of these is an API break.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::InvalidToken(_) => "invalid_token",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::Persistence(_) => "storage",
        }
    }

    /// Shorthand for a validation failure with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}
