//! # Accounts
//!
//! Account rows and their lifecycle. An account has two identifiers:
//! the internal `id` (store-assigned, primary key) and the external
//! 10-digit `account_number` (random, used for login and transfer
//! addressing). The two are deliberately distinct — the external handle
//! can be printed on an invoice without leaking row ordinals.

pub mod lifecycle;
pub mod number;
pub mod types;

pub use lifecycle::AccountService;
pub use types::{Account, NewAccount};
