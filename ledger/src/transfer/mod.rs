//! # Transfers
//!
//! The balance-mutation core. A transfer resolves both parties, then
//! hands the funds check and the dual balance write to the store's
//! serializable transaction — money moves atomically or not at all.

pub mod engine;

use serde::{Deserialize, Serialize};

pub use engine::TransferEngine;

/// A transfer request as the caller states it. Request-scoped only —
/// never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
    /// Amount to move, in the smallest currency denomination. Must be
    /// positive.
    pub amount: u64,
    /// External account number of the recipient.
    pub recipient_account_number: u64,
}

/// The result of a committed transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    /// Sender balance after the debit.
    pub sender_balance: u64,
    /// Recipient balance after the credit.
    pub recipient_balance: u64,
}
