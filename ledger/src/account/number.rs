//! Account number generation.
//!
//! External account numbers are drawn uniformly from the 10-digit range.
//! Uniqueness is NOT guaranteed here — the store's number index is the
//! constraint, and [`super::lifecycle`] redraws on collision.

use rand::Rng;

use crate::config::{ACCOUNT_NUMBER_MAX, ACCOUNT_NUMBER_MIN};

/// Draws a random 10-digit account number.
pub fn generate_account_number() -> u64 {
    rand::thread_rng().gen_range(ACCOUNT_NUMBER_MIN..=ACCOUNT_NUMBER_MAX)
}
