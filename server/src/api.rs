//! # REST API
//!
//! Builds the axum router that exposes the ledger's HTTP interface.
//! All endpoints share application state through axum's `State`
//! extractor.
//!
//! ## Endpoints
//!
//! | Method | Path            | Auth  | Description                       |
//! |--------|-----------------|-------|-----------------------------------|
//! | GET    | `/health`       | none  | Liveness probe                    |
//! | POST   | `/register`     | none  | Create an account                 |
//! | POST   | `/login`        | none  | Verify credentials, mint a token  |
//! | GET    | `/account/:id`  | token | Fetch the caller's account        |
//! | DELETE | `/account/:id`  | token | Delete the caller's account       |
//! | POST   | `/transfer`     | token | Move funds to another account     |
//!
//! ## Authentication
//!
//! Protected routes read the signed token from the `x-auth-token`
//! header via the [`Authenticated`] extractor. Validation happens
//! before the handler body runs; the handler receives the claims as an
//! explicit typed parameter, so there is no "claims missing from
//! context" case to guard against.
//!
//! ## Errors
//!
//! Every handler-level failure renders the same envelope:
//! `{ "error": <message>, "kind": <stable machine-readable kind> }`,
//! with the status code differentiated by kind.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use meridian_ledger::account::{Account, AccountService};
use meridian_ledger::auth::{Claims, TokenError, TokenService};
use meridian_ledger::config::{REQUEST_TIMEOUT, TOKEN_HEADER};
use meridian_ledger::error::LedgerError;
use meridian_ledger::transfer::{TransferEngine, TransferIntent};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Account lifecycle: create / fetch / authenticate / delete.
    pub accounts: Arc<AccountService>,
    /// The balance-mutation engine.
    pub transfers: Arc<TransferEngine>,
    /// Issues and validates signed account tokens.
    pub tokens: Arc<TokenService>,
    /// Prometheus metric handles for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Error Rendering
// ---------------------------------------------------------------------------

/// A handler-level failure, rendered as the JSON error envelope.
#[derive(Debug)]
pub enum ApiError {
    /// A failure from the ledger core, carrying its taxonomy kind.
    Domain(LedgerError),
    /// The authenticated caller tried to act on an account that is not
    /// their own.
    Forbidden(&'static str),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Domain(err)
    }
}

/// The JSON error envelope returned for every handler-level failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable kind — switch on this, not the message.
    pub kind: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(LedgerError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Domain(LedgerError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Domain(LedgerError::InvalidToken(_)) => StatusCode::FORBIDDEN,
            ApiError::Domain(LedgerError::InsufficientFunds { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Domain(LedgerError::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Domain(err) => err.kind(),
            ApiError::Forbidden(_) => "forbidden",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Domain(err) => err.to_string(),
            ApiError::Forbidden(msg) => (*msg).to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {}", self.message());
        } else {
            tracing::debug!(kind = self.kind(), "request rejected: {}", self.message());
        }
        let body = ErrorBody {
            error: self.message(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request Gate
// ---------------------------------------------------------------------------

/// Extractor that authenticates a request.
///
/// Reads the signed token from the [`TOKEN_HEADER`] header and
/// validates it. On failure the request short-circuits with a 403
/// envelope and the wrapped handler never runs; on success the handler
/// receives the validated [`Claims`] directly.
pub struct Authenticated(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or(ApiError::Domain(LedgerError::InvalidToken(
                TokenError::Missing,
            )))?;

        let claims = state
            .tokens
            .validate(token)
            .map_err(|e| ApiError::Domain(LedgerError::InvalidToken(e)))?;

        Ok(Authenticated(claims))
    }
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Request payload for `POST /register`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Request payload for `POST /login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub account_number: u64,
    pub password: String,
}

/// An account as the API exposes it. Deliberately has no
/// `password_hash` field — the credential hash never leaves the
/// process.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBody {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub account_number: u64,
    pub balance: u64,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountBody {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            account_number: account.account_number,
            balance: account.balance,
            created_at: account.created_at,
        }
    }
}

/// Response payload for `POST /login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub account: AccountBody,
    pub token: String,
}

/// Response payload for `DELETE /account/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Response payload for `POST /transfer`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub success: bool,
    /// Sender balance after the debit.
    pub sender_balance: u64,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, tracing,
/// and the request timeout.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route(
            "/account/:id",
            get(get_account_handler).delete(delete_account_handler),
        )
        .route("/transfer", post(transfer_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the service is alive.
///
/// This is the liveness probe for orchestrators. It intentionally does
/// not touch the store.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /register` — create an account.
///
/// Open endpoint. Returns the stored row (sans credential) including
/// the server-assigned id, the generated account number, and the
/// seeded starting balance.
async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AccountBody>, ApiError> {
    let Json(req) = body.map_err(bad_body)?;

    let account = state
        .accounts
        .create(&req.first_name, &req.last_name, &req.password)?;
    state.metrics.accounts_created_total.inc();

    Ok(Json(account.into()))
}

/// `POST /login` — verify credentials and mint a signed token.
///
/// The token embeds the account id and number and expires 24 hours
/// after issuance. Nothing is stored server-side.
async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body.map_err(bad_body)?;

    let account = state
        .accounts
        .authenticate(req.account_number, &req.password)
        .map_err(|e| {
            state.metrics.login_failures_total.inc();
            ApiError::from(e)
        })?;

    let token = state.tokens.issue(&account).map_err(|e| {
        ApiError::Domain(LedgerError::Persistence(format!(
            "token issuance failed: {e}"
        )))
    })?;
    state.metrics.logins_total.inc();

    Ok(Json(LoginResponse {
        account: account.into(),
        token,
    }))
}

/// `GET /account/:id` — fetch an account by id.
///
/// Restricted to the authenticated caller's own account: the id in the
/// path must match the id embedded in the token claims.
async fn get_account_handler(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<AccountBody>, ApiError> {
    let id = parse_account_id(&id)?;
    authorize_own_account(&claims, id)?;

    let account = state.accounts.get_by_id(id)?;
    Ok(Json(account.into()))
}

/// `DELETE /account/:id` — delete an account by id.
///
/// Restricted to the authenticated caller's own account. Deleting an
/// already-deleted account succeeds silently.
async fn delete_account_handler(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_account_id(&id)?;
    authorize_own_account(&claims, id)?;

    state.accounts.delete(id)?;
    state.metrics.accounts_deleted_total.inc();

    Ok(Json(DeleteResponse { deleted: true }))
}

/// `POST /transfer` — move funds from the caller to another account.
///
/// The sender is always the authenticated caller; only the amount and
/// the recipient come from the request body.
async fn transfer_handler(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
    body: Result<Json<TransferIntent>, JsonRejection>,
) -> Result<Json<TransferResponse>, ApiError> {
    let Json(intent) = body.map_err(bad_body)?;

    let timer = state.metrics.transfer_duration_seconds.start_timer();
    let result = state.transfers.execute(claims.account_number, &intent);
    timer.observe_duration();

    match result {
        Ok(outcome) => {
            state.metrics.transfers_total.inc();
            Ok(Json(TransferResponse {
                success: true,
                sender_balance: outcome.sender_balance,
            }))
        }
        Err(e @ LedgerError::InsufficientFunds { .. }) => {
            state.metrics.transfers_rejected_total.inc();
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Render a body-deserialization rejection as a validation failure so
/// malformed JSON gets the same envelope as every other client error.
fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::Domain(LedgerError::validation(rejection.body_text()))
}

fn parse_account_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::Domain(LedgerError::validation(format!("invalid account id: {raw}"))))
}

/// Entity-level authorization: the caller may only act on the account
/// their token was minted for.
fn authorize_own_account(claims: &Claims, id: u64) -> Result<(), ApiError> {
    if claims.id != id {
        return Err(ApiError::Forbidden(
            "account does not belong to the authenticated caller",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
