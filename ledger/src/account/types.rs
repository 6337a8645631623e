//! Account row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted account row.
///
/// This is the storage shape — it carries the credential hash and is
/// only ever bincode-encoded into the store. It is NOT serialized
/// outbound; the HTTP layer exposes its own response type without the
/// `password_hash` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Store-assigned primary key. Immutable.
    pub id: u64,
    /// Display name, immutable after creation.
    pub first_name: String,
    /// Display name, immutable after creation.
    pub last_name: String,
    /// Unique external 10-digit handle used for login and transfers.
    pub account_number: u64,
    /// Argon2id PHC hash of the account credential.
    pub password_hash: String,
    /// Balance in the smallest currency denomination. Non-negative by
    /// representation; the transfer transaction keeps it that way.
    pub balance: u64,
    /// Store-assigned creation timestamp. Immutable.
    pub created_at: DateTime<Utc>,
}

/// The fields the caller supplies when creating an account. The store
/// assigns `id` and `created_at` itself.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub account_number: u64,
    pub password_hash: String,
    pub balance: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_json_uses_camel_case_field_names() {
        let account = Account {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            account_number: 1_234_567_890,
            password_hash: "$argon2id$stub".into(),
            balance: 10_000,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&account).expect("serialize");
        assert!(json.get("firstName").is_some());
        assert!(json.get("accountNumber").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("first_name").is_none());
    }

    #[test]
    fn account_bincode_round_trip() {
        let account = Account {
            id: 42,
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            account_number: 9_876_543_210,
            password_hash: "$argon2id$stub".into(),
            balance: 500,
            created_at: Utc::now(),
        };

        let bytes = bincode::serialize(&account).expect("encode");
        let decoded: Account = bincode::deserialize(&bytes).expect("decode");
        assert_eq!(decoded, account);
    }
}
