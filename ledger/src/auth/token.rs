//! Token Service.
//!
//! Issues and validates the signed, time-boxed assertion that binds a
//! caller to an account. HS256 JWTs: symmetric, deterministic, and any
//! tampering with the payload invalidates the signature. The algorithm
//! is pinned — a token presenting any other `alg` is rejected outright.
//!
//! The signing secret is injected at construction. There is no
//! compiled-in default; the server loads it from the environment or a
//! secret file at startup.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::types::Account;
use crate::config::{TOKEN_SECRET_MIN_LENGTH, TOKEN_TTL_SECS};

/// The decoded payload of a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Internal account id of the authenticated caller.
    pub id: u64,
    /// External account number of the authenticated caller.
    pub account_number: u64,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expires-at, seconds since the Unix epoch. 24h after `iat`.
    pub exp: i64,
}

/// Errors from token issuance and validation.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No token was presented on a protected request.
    #[error("missing token")]
    Missing,

    /// The token's validity window has passed.
    #[error("token expired")]
    Expired,

    /// Signature mismatch or an unexpected signing algorithm — either
    /// way the payload cannot be trusted.
    #[error("bad signature or algorithm")]
    Signature,

    /// The token string or its claim set cannot be parsed.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The configured signing secret is shorter than the HS256 floor.
    #[error("signing secret too short: {0} bytes, need at least {min}", min = TOKEN_SECRET_MIN_LENGTH)]
    WeakSecret(usize),
}

/// Issues and validates signed account tokens.
///
/// Cheap to construct, cheap to clone; the server holds one behind an
/// `Arc` for the process lifetime.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build a token service around an externally supplied secret.
    ///
    /// Rejects secrets below [`TOKEN_SECRET_MIN_LENGTH`] bytes — an
    /// HS256 secret shorter than the hash output weakens the MAC.
    pub fn new(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.len() < TOKEN_SECRET_MIN_LENGTH {
            return Err(TokenError::WeakSecret(secret.len()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact. A token is either valid or it isn't.
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Issue a token for an account, valid for 24 hours from now.
    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        self.issue_at(account, Utc::now())
    }

    /// Issue a token with an explicit issued-at instant. Exists so the
    /// expiry path is testable without a 24-hour sleep.
    pub(crate) fn issue_at(
        &self,
        account: &Account,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            id: account.id,
            account_number: account.account_number,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Validate a token string and return its embedded claims.
    ///
    /// Fails on signature mismatch, unexpected algorithm, expired
    /// `exp`, or a malformed payload.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidAlgorithm
                    | ErrorKind::InvalidAlgorithmName
                    | ErrorKind::ImmatureSignature => TokenError::Signature,
                    _ => TokenError::Malformed(e.to_string()),
                }
            })
    }
}
