//! Account lifecycle — create, fetch, authenticate, delete.

use std::sync::Arc;

use crate::account::number::generate_account_number;
use crate::account::types::{Account, NewAccount};
use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::config::{ACCOUNT_NUMBER_MAX_ATTEMPTS, MIN_PASSWORD_LENGTH, STARTING_BALANCE};
use crate::error::LedgerError;
use crate::store::db::{LedgerDb, StoreError};

/// Orchestrates account row lifecycle on top of the store.
///
/// Creation seeds the starting balance, hashes the credential, and
/// redraws the random account number on an index collision instead of
/// surfacing a raw constraint violation to the caller.
pub struct AccountService {
    db: Arc<LedgerDb>,
}

impl AccountService {
    pub fn new(db: Arc<LedgerDb>) -> Self {
        Self { db }
    }

    /// Create an account: validate, hash the credential, seed the
    /// starting balance, and persist under a freshly drawn 10-digit
    /// account number.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] for empty names or a short password;
    /// [`LedgerError::Persistence`] if the store fails or the retry
    /// budget for number collisions is exhausted.
    pub fn create(
        &self,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> Result<Account, LedgerError> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(LedgerError::validation("first and last name are required"));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(LedgerError::validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let password_hash = hash_password(password)
            .map_err(|e| LedgerError::Persistence(format!("credential hashing failed: {e}")))?;

        for _ in 0..ACCOUNT_NUMBER_MAX_ATTEMPTS {
            let account_number = generate_account_number();
            match self.db.create_account(NewAccount {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                account_number,
                password_hash: password_hash.clone(),
                balance: STARTING_BALANCE,
            }) {
                Ok(account) => {
                    tracing::info!(
                        id = account.id,
                        account_number = account.account_number,
                        "account created"
                    );
                    return Ok(account);
                }
                Err(StoreError::NumberTaken(n)) => {
                    tracing::debug!(account_number = n, "account number collision, redrawing");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::Persistence(format!(
            "could not draw a unique account number in {ACCOUNT_NUMBER_MAX_ATTEMPTS} attempts"
        )))
    }

    /// Fetch an account by its internal id.
    pub fn get_by_id(&self, id: u64) -> Result<Account, LedgerError> {
        self.db
            .get_account_by_id(id)?
            .ok_or(LedgerError::NotFound("account"))
    }

    /// Fetch an account by its external account number.
    pub fn get_by_number(&self, account_number: u64) -> Result<Account, LedgerError> {
        self.db
            .get_account_by_number(account_number)?
            .ok_or(LedgerError::NotFound("account"))
    }

    /// Verify a login: resolve the account by number and check the
    /// credential against the stored hash. Returns the account on
    /// success so the caller can mint a token for it.
    pub fn authenticate(
        &self,
        account_number: u64,
        password: &str,
    ) -> Result<Account, LedgerError> {
        let account = self.get_by_number(account_number)?;
        match verify_password(password, &account.password_hash) {
            Ok(()) => Ok(account),
            Err(PasswordError::Mismatch) => {
                tracing::warn!(account_number, "login rejected: credential mismatch");
                Err(LedgerError::validation("invalid credentials"))
            }
            Err(e) => Err(LedgerError::Persistence(format!(
                "credential verification failed: {e}"
            ))),
        }
    }

    /// Delete an account row. Deleting a missing row succeeds silently.
    pub fn delete(&self, id: u64) -> Result<(), LedgerError> {
        self.db.delete_account(id)?;
        tracing::info!(id, "account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ACCOUNT_NUMBER_MAX, ACCOUNT_NUMBER_MIN};

    fn service() -> AccountService {
        AccountService::new(Arc::new(LedgerDb::open_temporary().unwrap()))
    }

    #[test]
    fn create_seeds_balance_and_ten_digit_number() {
        let svc = service();
        let account = svc.create("Ada", "Lovelace", "analytical-engine").unwrap();

        assert_eq!(account.balance, STARTING_BALANCE);
        assert!((ACCOUNT_NUMBER_MIN..=ACCOUNT_NUMBER_MAX).contains(&account.account_number));
        assert_eq!(account.first_name, "Ada");
        assert_eq!(account.last_name, "Lovelace");
    }

    #[test]
    fn create_generates_unique_numbers() {
        let svc = service();
        let a = svc.create("A", "One", "password-one").unwrap();
        let b = svc.create("B", "Two", "password-two").unwrap();
        assert_ne!(a.account_number, b.account_number);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn create_rejects_blank_names() {
        let svc = service();
        let err = svc.create("  ", "Lovelace", "long-enough-pw").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn create_rejects_short_password() {
        let svc = service();
        let err = svc.create("Ada", "Lovelace", "short").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn created_account_is_fetchable_and_names_survive() {
        let svc = service();
        let created = svc.create("Grace", "Hopper", "cobol-forever").unwrap();

        let fetched = svc.get_by_id(created.id).unwrap();
        assert_eq!(fetched.first_name, created.first_name);
        assert_eq!(fetched.last_name, created.last_name);
        assert_eq!(fetched.account_number, created.account_number);
        assert_eq!(fetched.balance, created.balance);
    }

    #[test]
    fn get_by_id_missing_is_not_found() {
        let svc = service();
        let err = svc.get_by_id(404).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn authenticate_accepts_correct_credentials() {
        let svc = service();
        let created = svc.create("Ada", "Lovelace", "analytical-engine").unwrap();

        let account = svc
            .authenticate(created.account_number, "analytical-engine")
            .unwrap();
        assert_eq!(account.id, created.id);
    }

    #[test]
    fn authenticate_rejects_wrong_password() {
        let svc = service();
        let created = svc.create("Ada", "Lovelace", "analytical-engine").unwrap();

        let err = svc
            .authenticate(created.account_number, "difference-engine")
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn authenticate_unknown_number_is_not_found() {
        let svc = service();
        let err = svc.authenticate(1_000_000_000, "whatever-pw").unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn delete_then_fetch_is_not_found() {
        let svc = service();
        let created = svc.create("Ada", "Lovelace", "analytical-engine").unwrap();

        svc.delete(created.id).unwrap();
        assert_eq!(svc.get_by_id(created.id).unwrap_err().kind(), "not_found");

        // Deleting again is silent.
        svc.delete(created.id).unwrap();
    }
}
