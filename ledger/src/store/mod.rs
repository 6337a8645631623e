//! # Storage
//!
//! Persistence for account rows, built on sled's embedded key-value
//! store. The store exclusively owns account row lifecycle — nothing
//! else in the crate touches disk.

pub mod db;

pub use db::{LedgerDb, StoreError, TransferApplied, TransferError};
