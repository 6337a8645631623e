//! # LedgerDb — Persistent Storage Engine
//!
//! The persistence layer for account rows, built on sled's embedded
//! key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees" (analogous to tables in SQL).
//! Each tree is an independent B+ tree with its own keyspace:
//!
//! | Tree       | Key                     | Value                    |
//! |------------|-------------------------|--------------------------|
//! | `accounts` | `id` (8B BE)            | `bincode(Account)`       |
//! | `numbers`  | `account_number` (8B BE)| `id` (8B BE)             |
//! | `metadata` | key (UTF-8)             | value (bytes)            |
//!
//! Ids and account numbers are stored as big-endian u64 so that sled's
//! lexicographic ordering matches numeric ordering.
//!
//! The `numbers` tree is the uniqueness constraint on account numbers:
//! inserts go through compare-and-swap, so a colliding number is
//! detected as [`StoreError::NumberTaken`] instead of silently
//! overwriting another account's index entry.
//!
//! ## Atomicity
//!
//! A transfer's funds check and both balance writes execute inside one
//! serializable [`sled::Tree::transaction`]. Two concurrent transfers
//! draining the same sender cannot both observe the pre-debit balance —
//! one of them re-runs against the committed state and fails the check.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Tree};
use std::path::Path;

use chrono::Utc;
use thiserror::Error;

use crate::account::types::{Account, NewAccount};

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Codec(String),

    #[error("account number {0} is already taken")]
    NumberTaken(u64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors specific to the transfer transaction.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The sender row vanished between resolution and the transaction.
    #[error("sender account row is gone")]
    SenderMissing,

    /// The recipient row vanished between resolution and the transaction.
    #[error("recipient account row is gone")]
    RecipientMissing,

    /// The sender cannot cover the amount. Carries the balance observed
    /// inside the transaction, which is the authoritative one.
    #[error("insufficient balance: available {available}, requested {requested}")]
    Insufficient {
        /// Sender balance at transaction time.
        available: u64,
        /// Requested transfer amount.
        requested: u64,
    },

    /// Crediting the recipient would exceed `u64::MAX`. If you're
    /// hitting this, someone is trying to hold more than 18.4
    /// quintillion units in one account.
    #[error("recipient balance would overflow")]
    Overflow,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The committed result of a transfer transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferApplied {
    /// Sender balance after the debit.
    pub sender_balance: u64,
    /// Recipient balance after the credit.
    pub recipient_balance: u64,
}

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Well-known key in the `metadata` tree for the account id counter.
const META_NEXT_ACCOUNT_ID: &[u8] = b"next_account_id";

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent storage engine for account rows.
///
/// Wraps a sled `Db` instance and exposes typed accessors for accounts
/// and the account-number index. All serialization uses bincode.
///
/// # Thread Safety
///
/// sled is inherently thread-safe — all trees support lock-free
/// concurrent reads and serialized writes. `LedgerDb` can be shared
/// across tasks via `Arc<LedgerDb>` without external synchronization.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    /// The underlying sled database handle.
    db: Db,
    /// Account rows indexed by id (big-endian u64 keys).
    accounts: Tree,
    /// Uniqueness index: account number (8B BE) -> id (8B BE).
    numbers: Tree,
    /// Arbitrary key-value metadata (id counter, etc.).
    metadata: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that lives in memory and is cleaned
    /// up automatically when the `LedgerDb` is dropped.
    ///
    /// Ideal for unit tests — no filesystem side effects, no cleanup.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    /// Internal constructor: opens named trees from an existing sled `Db`.
    fn from_db(db: Db) -> StoreResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let numbers = db.open_tree("numbers")?;
        let metadata = db.open_tree("metadata")?;

        Ok(Self {
            db,
            accounts,
            numbers,
            metadata,
        })
    }

    // -- Account creation ---------------------------------------------------

    /// Persist a new account row.
    ///
    /// Assigns the next id from the metadata counter, claims the account
    /// number in the `numbers` index via compare-and-swap, stamps
    /// `created_at`, and writes the row. Returns the stored row.
    ///
    /// # Errors
    ///
    /// [`StoreError::NumberTaken`] if another account already holds the
    /// requested account number — callers redraw and retry.
    pub fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        let id = self.alloc_account_id()?;

        // Claim the number index entry first. CAS against None makes a
        // concurrent claim of the same number lose cleanly.
        let claim = self.numbers.compare_and_swap(
            new.account_number.to_be_bytes(),
            None as Option<&[u8]>,
            Some(&id.to_be_bytes()[..]),
        )?;
        if claim.is_err() {
            return Err(StoreError::NumberTaken(new.account_number));
        }

        let account = Account {
            id,
            first_name: new.first_name,
            last_name: new.last_name,
            account_number: new.account_number,
            password_hash: new.password_hash,
            balance: new.balance,
            created_at: Utc::now(),
        };

        self.accounts
            .insert(id.to_be_bytes(), encode_account(&account)?)?;
        self.db.flush()?;

        Ok(account)
    }

    /// Allocate the next account id from the metadata counter. Ids start
    /// at 1 and only ever grow; an id burned by a failed creation stays
    /// burned.
    fn alloc_account_id(&self) -> StoreResult<u64> {
        let bytes = self
            .metadata
            .update_and_fetch(META_NEXT_ACCOUNT_ID, |old| {
                let next = old.map(decode_u64).unwrap_or(0) + 1;
                Some(next.to_be_bytes().to_vec())
            })?
            .expect("update_and_fetch with Some always yields a value");
        Ok(decode_u64(&bytes))
    }

    // -- Point lookups ------------------------------------------------------

    /// Retrieve an account by its internal id.
    ///
    /// Returns `None` if no row matches.
    pub fn get_account_by_id(&self, id: u64) -> StoreResult<Option<Account>> {
        match self.accounts.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode_account(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Retrieve an account by its external account number.
    ///
    /// Two-step lookup: number -> id (from `numbers`), then id -> row.
    pub fn get_account_by_number(&self, account_number: u64) -> StoreResult<Option<Account>> {
        match self.numbers.get(account_number.to_be_bytes())? {
            Some(id_bytes) => self.get_account_by_id(decode_u64(&id_bytes)),
            None => Ok(None),
        }
    }

    // -- Mutation -----------------------------------------------------------

    /// Unconditionally overwrite the balance column of an account row.
    ///
    /// No concurrency token — last write wins. A missing row is a no-op,
    /// matching an UPDATE that affects zero rows. The transfer path does
    /// NOT use this; it goes through [`LedgerDb::transfer`].
    pub fn update_balance(&self, id: u64, new_balance: u64) -> StoreResult<()> {
        if let Some(bytes) = self.accounts.get(id.to_be_bytes())? {
            let mut account = decode_account(&bytes)?;
            account.balance = new_balance;
            self.accounts
                .insert(id.to_be_bytes(), encode_account(&account)?)?;
            self.db.flush()?;
        }
        Ok(())
    }

    /// Remove an account row and its number index entry.
    ///
    /// Succeeds silently when no row matched.
    pub fn delete_account(&self, id: u64) -> StoreResult<()> {
        if let Some(bytes) = self.accounts.remove(id.to_be_bytes())? {
            let account = decode_account(&bytes)?;
            self.numbers.remove(account.account_number.to_be_bytes())?;
            self.db.flush()?;
        }
        Ok(())
    }

    // -- Transfer -----------------------------------------------------------

    /// Move `amount` from `sender_id` to `recipient_id` atomically.
    ///
    /// The funds check and both balance writes execute inside a single
    /// serializable transaction over the `accounts` tree: both rows are
    /// re-read fresh, the check runs against the committed balance, and
    /// either both new balances land or neither does.
    ///
    /// The funds check is strict — `amount >= balance` fails, so a
    /// transfer that would leave exactly zero is rejected.
    ///
    /// `sender_id` and `recipient_id` must be distinct; both writes key
    /// the same tree and the same row would make the second write
    /// swallow the first. Callers reject self-transfers before this.
    pub fn transfer(
        &self,
        sender_id: u64,
        recipient_id: u64,
        amount: u64,
    ) -> Result<TransferApplied, TransferError> {
        debug_assert_ne!(sender_id, recipient_id);

        let result = self.accounts.transaction(|tx| {
            let sender_bytes = tx
                .get(sender_id.to_be_bytes())?
                .ok_or(ConflictableTransactionError::Abort(
                    TransferError::SenderMissing,
                ))?;
            let recipient_bytes =
                tx.get(recipient_id.to_be_bytes())?
                    .ok_or(ConflictableTransactionError::Abort(
                        TransferError::RecipientMissing,
                    ))?;

            let mut sender = decode_account(&sender_bytes)
                .map_err(|e| ConflictableTransactionError::Abort(TransferError::Store(e)))?;
            let mut recipient = decode_account(&recipient_bytes)
                .map_err(|e| ConflictableTransactionError::Abort(TransferError::Store(e)))?;

            if amount >= sender.balance {
                return Err(ConflictableTransactionError::Abort(
                    TransferError::Insufficient {
                        available: sender.balance,
                        requested: amount,
                    },
                ));
            }

            sender.balance -= amount;
            recipient.balance = recipient.balance.checked_add(amount).ok_or(
                ConflictableTransactionError::Abort(TransferError::Overflow),
            )?;

            let sender_row = encode_account(&sender)
                .map_err(|e| ConflictableTransactionError::Abort(TransferError::Store(e)))?;
            let recipient_row = encode_account(&recipient)
                .map_err(|e| ConflictableTransactionError::Abort(TransferError::Store(e)))?;

            tx.insert(&sender.id.to_be_bytes(), sender_row)?;
            tx.insert(&recipient.id.to_be_bytes(), recipient_row)?;

            Ok(TransferApplied {
                sender_balance: sender.balance,
                recipient_balance: recipient.balance,
            })
        });

        match result {
            Ok(applied) => {
                self.db.flush().map_err(StoreError::from)?;
                Ok(applied)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(TransferError::Store(e.into())),
        }
    }

    // -- Utility operations -------------------------------------------------

    /// Return the number of account rows in the database.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Codec Helpers
// ---------------------------------------------------------------------------

fn encode_account(account: &Account) -> StoreResult<Vec<u8>> {
    bincode::serialize(account).map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode_account(bytes: &[u8]) -> StoreResult<Account> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec(e.to_string()))
}

/// Decode a big-endian u64 key/value, tolerating short input (treated
/// as zero) so the closure-based sled APIs never panic mid-update.
fn decode_u64(bytes: impl AsRef<[u8]>) -> u64 {
    let bytes = bytes.as_ref();
    let mut buf = [0u8; 8];
    if bytes.len() == 8 {
        buf.copy_from_slice(bytes);
    }
    u64::from_be_bytes(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_row(number: u64, balance: u64) -> NewAccount {
        NewAccount {
            first_name: "Test".into(),
            last_name: "User".into(),
            account_number: number,
            password_hash: "$argon2id$stub".into(),
            balance,
        }
    }

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.account_count(), 0);
    }

    #[test]
    fn open_persistent_database_and_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = LedgerDb::open(dir.path()).expect("should open db");
        let created = db.create_account(new_row(1_111_111_111, 500)).unwrap();
        drop(db);

        // Re-open and verify the row survived.
        let db2 = LedgerDb::open(dir.path()).expect("should reopen db");
        let fetched = db2
            .get_account_by_id(created.id)
            .unwrap()
            .expect("row should persist");
        assert_eq!(fetched, created);
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let db = LedgerDb::open_temporary().unwrap();
        let a = db.create_account(new_row(1_000_000_001, 0)).unwrap();
        let b = db.create_account(new_row(1_000_000_002, 0)).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn create_returns_stored_row_with_timestamp() {
        let db = LedgerDb::open_temporary().unwrap();
        let before = Utc::now();
        let account = db.create_account(new_row(1_234_567_890, 10_000)).unwrap();

        assert_eq!(account.account_number, 1_234_567_890);
        assert_eq!(account.balance, 10_000);
        assert!(account.created_at >= before);
    }

    #[test]
    fn lookup_by_id_and_number_agree() {
        let db = LedgerDb::open_temporary().unwrap();
        let created = db.create_account(new_row(2_222_222_222, 300)).unwrap();

        let by_id = db.get_account_by_id(created.id).unwrap().unwrap();
        let by_number = db.get_account_by_number(2_222_222_222).unwrap().unwrap();
        assert_eq!(by_id, created);
        assert_eq!(by_number, created);
    }

    #[test]
    fn lookup_missing_returns_none() {
        let db = LedgerDb::open_temporary().unwrap();
        assert!(db.get_account_by_id(999).unwrap().is_none());
        assert!(db.get_account_by_number(9_999_999_999).unwrap().is_none());
    }

    #[test]
    fn duplicate_account_number_is_rejected() {
        let db = LedgerDb::open_temporary().unwrap();
        db.create_account(new_row(3_333_333_333, 0)).unwrap();

        let err = db.create_account(new_row(3_333_333_333, 0)).unwrap_err();
        assert!(matches!(err, StoreError::NumberTaken(3_333_333_333)));
        // The first owner of the number must be untouched.
        assert!(db.get_account_by_number(3_333_333_333).unwrap().is_some());
        assert_eq!(db.account_count(), 1);
    }

    #[test]
    fn update_balance_overwrites() {
        let db = LedgerDb::open_temporary().unwrap();
        let account = db.create_account(new_row(4_444_444_444, 100)).unwrap();

        db.update_balance(account.id, 7_500).unwrap();
        let fetched = db.get_account_by_id(account.id).unwrap().unwrap();
        assert_eq!(fetched.balance, 7_500);
    }

    #[test]
    fn update_balance_on_missing_row_is_a_noop() {
        let db = LedgerDb::open_temporary().unwrap();
        db.update_balance(12_345, 1).unwrap();
        assert_eq!(db.account_count(), 0);
    }

    #[test]
    fn delete_removes_row_and_number_index() {
        let db = LedgerDb::open_temporary().unwrap();
        let account = db.create_account(new_row(5_555_555_555, 0)).unwrap();

        db.delete_account(account.id).unwrap();
        assert!(db.get_account_by_id(account.id).unwrap().is_none());
        assert!(db.get_account_by_number(5_555_555_555).unwrap().is_none());

        // The freed number can be claimed again.
        db.create_account(new_row(5_555_555_555, 0)).unwrap();
    }

    #[test]
    fn delete_missing_row_succeeds_silently() {
        let db = LedgerDb::open_temporary().unwrap();
        db.delete_account(404).unwrap();
    }

    #[test]
    fn transfer_moves_funds_and_conserves_total() {
        let db = LedgerDb::open_temporary().unwrap();
        let sender = db.create_account(new_row(6_000_000_001, 1_000)).unwrap();
        let recipient = db.create_account(new_row(6_000_000_002, 250)).unwrap();

        let applied = db.transfer(sender.id, recipient.id, 400).unwrap();
        assert_eq!(applied.sender_balance, 600);
        assert_eq!(applied.recipient_balance, 650);

        let s = db.get_account_by_id(sender.id).unwrap().unwrap();
        let r = db.get_account_by_id(recipient.id).unwrap().unwrap();
        assert_eq!(s.balance + r.balance, 1_250);
    }

    #[test]
    fn transfer_rejects_insufficient_balance_without_mutation() {
        let db = LedgerDb::open_temporary().unwrap();
        let sender = db.create_account(new_row(6_000_000_003, 100)).unwrap();
        let recipient = db.create_account(new_row(6_000_000_004, 0)).unwrap();

        let err = db.transfer(sender.id, recipient.id, 500).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Insufficient {
                available: 100,
                requested: 500,
            }
        ));

        assert_eq!(db.get_account_by_id(sender.id).unwrap().unwrap().balance, 100);
        assert_eq!(db.get_account_by_id(recipient.id).unwrap().unwrap().balance, 0);
    }

    #[test]
    fn transfer_of_exact_balance_is_rejected() {
        // The funds check is strict: draining to exactly zero fails.
        let db = LedgerDb::open_temporary().unwrap();
        let sender = db.create_account(new_row(6_000_000_005, 100)).unwrap();
        let recipient = db.create_account(new_row(6_000_000_006, 0)).unwrap();

        let err = db.transfer(sender.id, recipient.id, 100).unwrap_err();
        assert!(matches!(err, TransferError::Insufficient { .. }));
    }

    #[test]
    fn transfer_to_missing_recipient_fails_without_debit() {
        let db = LedgerDb::open_temporary().unwrap();
        let sender = db.create_account(new_row(6_000_000_007, 1_000)).unwrap();

        let err = db.transfer(sender.id, 404, 10).unwrap_err();
        assert!(matches!(err, TransferError::RecipientMissing));
        assert_eq!(
            db.get_account_by_id(sender.id).unwrap().unwrap().balance,
            1_000
        );
    }

    #[test]
    fn transfer_from_missing_sender_fails() {
        let db = LedgerDb::open_temporary().unwrap();
        let recipient = db.create_account(new_row(6_000_000_008, 0)).unwrap();

        let err = db.transfer(404, recipient.id, 10).unwrap_err();
        assert!(matches!(err, TransferError::SenderMissing));
    }

    #[test]
    fn recipient_overflow_is_rejected_without_mutation() {
        let db = LedgerDb::open_temporary().unwrap();
        let sender = db.create_account(new_row(6_000_000_009, 1_000)).unwrap();
        let recipient = db
            .create_account(new_row(6_000_000_010, u64::MAX - 5))
            .unwrap();

        let err = db.transfer(sender.id, recipient.id, 10).unwrap_err();
        assert!(matches!(err, TransferError::Overflow));
        assert_eq!(
            db.get_account_by_id(sender.id).unwrap().unwrap().balance,
            1_000
        );
    }

    #[test]
    fn concurrent_drains_of_one_sender_never_overdraw() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let db = Arc::new(LedgerDb::open_temporary().unwrap());
        let sender = db.create_account(new_row(7_000_000_001, 1_000)).unwrap();
        let recipient = db.create_account(new_row(7_000_000_002, 0)).unwrap();

        // Two transfers of balance/2 + 1 each: individually fine, but
        // together they would overdraw. At most one may commit.
        let amount = 1_000 / 2 + 1;
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                let (s, r) = (sender.id, recipient.id);
                thread::spawn(move || {
                    barrier.wait();
                    db.transfer(s, r, amount)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("transfer thread should not panic"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one of the two drains may commit");

        let s = db.get_account_by_id(sender.id).unwrap().unwrap();
        let r = db.get_account_by_id(recipient.id).unwrap().unwrap();
        assert_eq!(s.balance, 1_000 - amount);
        assert_eq!(r.balance, amount);
        assert_eq!(s.balance + r.balance, 1_000, "total is conserved");
    }
}
