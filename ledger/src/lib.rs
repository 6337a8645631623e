// Copyright (c) 2026 Meridian Contributors. MIT License.
// See LICENSE for details.

//! # Meridian Ledger — Core Library
//!
//! The core of a small ledger service: clients register accounts,
//! authenticate, inspect balances, and move funds between accounts.
//! Everything that touches an account row lives in this crate; the HTTP
//! surface in `meridian-server` is a thin shell around it.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! ledger:
//!
//! - **account** — Account rows, number generation, and lifecycle
//!   (create / fetch / delete / authenticate).
//! - **auth** — Credential hashing and the signed-token service that
//!   binds a caller to an account number.
//! - **store** — Persistent storage over sled. Owns every byte on disk.
//! - **transfer** — The balance-mutation engine. Funds check and both
//!   balance writes execute as one serializable transaction.
//! - **config** — Service constants. No magic numbers anywhere else.
//! - **error** — The error taxonomy the HTTP boundary renders.
//!
//! ## Design Philosophy
//!
//! 1. A balance is a `u64` and the store never lets it underflow — the
//!    invariant is enforced by the transfer transaction, not by the
//!    integer's bit width.
//! 2. Money moves atomically or not at all. There is no state in which
//!    funds left a sender without arriving at the recipient.
//! 3. If it touches a balance, it has tests. Plural.

pub mod account;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;
pub mod transfer;
