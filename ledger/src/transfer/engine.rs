//! Transfer Engine.
//!
//! Per-request state machine:
//!
//! 1. Validate the intent (`amount > 0`, recipient is not the sender).
//! 2. Resolve the sender by the authenticated caller's account number.
//! 3. Resolve the recipient by the intent's account number.
//! 4. Apply: funds check + both balance writes, inside one serializable
//!    store transaction that re-reads both rows fresh.
//!
//! The engine holds no account state beyond a single call. Steps 2–3
//! only establish that both parties exist (so the caller gets a precise
//! not-found); the transaction in step 4 is the authoritative read.

use std::sync::Arc;

use crate::error::LedgerError;
use crate::store::db::{LedgerDb, TransferError};
use crate::transfer::{TransferIntent, TransferOutcome};

/// Applies funds checks and dual balance mutations for transfer requests.
pub struct TransferEngine {
    db: Arc<LedgerDb>,
}

impl TransferEngine {
    pub fn new(db: Arc<LedgerDb>) -> Self {
        Self { db }
    }

    /// Execute a transfer on behalf of the authenticated caller.
    ///
    /// `sender_number` comes from validated token claims — never from
    /// the request body.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] — zero amount or self-transfer.
    /// - [`LedgerError::NotFound`] — unknown sender or recipient.
    /// - [`LedgerError::InsufficientFunds`] — strict funds check failed
    ///   (`amount >= balance`; draining to exactly zero is rejected).
    /// - [`LedgerError::Persistence`] — the store failed.
    pub fn execute(
        &self,
        sender_number: u64,
        intent: &TransferIntent,
    ) -> Result<TransferOutcome, LedgerError> {
        if intent.amount == 0 {
            return Err(LedgerError::validation("transfer amount must be positive"));
        }
        if intent.recipient_account_number == sender_number {
            // Both writes would key the same row; the second would
            // swallow the first and mint money out of thin air.
            return Err(LedgerError::validation(
                "cannot transfer to the sending account",
            ));
        }

        let sender = self
            .db
            .get_account_by_number(sender_number)?
            .ok_or(LedgerError::NotFound("sender account"))?;
        let recipient = self
            .db
            .get_account_by_number(intent.recipient_account_number)?
            .ok_or(LedgerError::NotFound("recipient account"))?;

        let applied = self
            .db
            .transfer(sender.id, recipient.id, intent.amount)
            .map_err(|e| match e {
                TransferError::Insufficient {
                    available,
                    requested,
                } => LedgerError::InsufficientFunds {
                    available,
                    requested,
                },
                TransferError::SenderMissing => LedgerError::NotFound("sender account"),
                TransferError::RecipientMissing => LedgerError::NotFound("recipient account"),
                TransferError::Overflow => {
                    LedgerError::validation("transfer would overflow the recipient balance")
                }
                TransferError::Store(e) => e.into(),
            })?;

        tracing::info!(
            sender = sender.account_number,
            recipient = recipient.account_number,
            amount = intent.amount,
            "transfer applied"
        );

        Ok(TransferOutcome {
            sender_balance: applied.sender_balance,
            recipient_balance: applied.recipient_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::types::NewAccount;

    fn setup() -> (Arc<LedgerDb>, TransferEngine) {
        let db = Arc::new(LedgerDb::open_temporary().unwrap());
        let engine = TransferEngine::new(Arc::clone(&db));
        (db, engine)
    }

    fn seed(db: &LedgerDb, number: u64, balance: u64) {
        db.create_account(NewAccount {
            first_name: "Test".into(),
            last_name: "User".into(),
            account_number: number,
            password_hash: "$argon2id$stub".into(),
            balance,
        })
        .unwrap();
    }

    fn balance_of(db: &LedgerDb, number: u64) -> u64 {
        db.get_account_by_number(number).unwrap().unwrap().balance
    }

    const ALICE: u64 = 1_000_000_001;
    const BOB: u64 = 1_000_000_002;

    #[test]
    fn transfer_below_balance_moves_funds() {
        let (db, engine) = setup();
        seed(&db, ALICE, 1_000);
        seed(&db, BOB, 200);

        let outcome = engine
            .execute(
                ALICE,
                &TransferIntent {
                    amount: 300,
                    recipient_account_number: BOB,
                },
            )
            .unwrap();

        assert_eq!(outcome.sender_balance, 700);
        assert_eq!(outcome.recipient_balance, 500);
        assert_eq!(balance_of(&db, ALICE) + balance_of(&db, BOB), 1_200);
    }

    #[test]
    fn transfer_at_or_above_balance_is_rejected_without_mutation() {
        let (db, engine) = setup();
        seed(&db, ALICE, 500);
        seed(&db, BOB, 0);

        for amount in [500, 501, 10_000] {
            let err = engine
                .execute(
                    ALICE,
                    &TransferIntent {
                        amount,
                        recipient_account_number: BOB,
                    },
                )
                .unwrap_err();
            assert_eq!(err.kind(), "insufficient_funds");
        }

        assert_eq!(balance_of(&db, ALICE), 500);
        assert_eq!(balance_of(&db, BOB), 0);
    }

    #[test]
    fn transfer_to_unknown_recipient_is_not_found() {
        let (db, engine) = setup();
        seed(&db, ALICE, 1_000);

        let err = engine
            .execute(
                ALICE,
                &TransferIntent {
                    amount: 10,
                    recipient_account_number: 9_999_999_999,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(balance_of(&db, ALICE), 1_000);
    }

    #[test]
    fn transfer_from_unknown_sender_is_not_found() {
        let (db, engine) = setup();
        seed(&db, BOB, 100);

        let err = engine
            .execute(
                ALICE,
                &TransferIntent {
                    amount: 10,
                    recipient_account_number: BOB,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn zero_amount_is_rejected() {
        let (db, engine) = setup();
        seed(&db, ALICE, 1_000);
        seed(&db, BOB, 0);

        let err = engine
            .execute(
                ALICE,
                &TransferIntent {
                    amount: 0,
                    recipient_account_number: BOB,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn self_transfer_is_rejected() {
        let (db, engine) = setup();
        seed(&db, ALICE, 1_000);

        let err = engine
            .execute(
                ALICE,
                &TransferIntent {
                    amount: 100,
                    recipient_account_number: ALICE,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(balance_of(&db, ALICE), 1_000);
    }

    #[test]
    fn concurrent_transfers_cannot_overdraw_the_sender() {
        use std::sync::Barrier;
        use std::thread;

        let (db, engine) = setup();
        seed(&db, ALICE, 1_000);
        seed(&db, BOB, 0);
        let engine = Arc::new(engine);

        // Two simultaneous transfers of balance/2 + 1: each passes the
        // funds check against the original balance, but only one may
        // commit. The serialized total debited never exceeds 1_000.
        let amount = 1_000 / 2 + 1;
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    engine.execute(
                        ALICE,
                        &TransferIntent {
                            amount,
                            recipient_account_number: BOB,
                        },
                    )
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("no panic"))
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(balance_of(&db, ALICE), 1_000 - amount);
        assert_eq!(balance_of(&db, BOB), amount);
    }
}
