// Card Ledger - Web Server
// REST API over the ledger core with Axum

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use card_ledger::{
    authenticate, choose_source, list_atms, list_cards, list_services, logging, open_store,
    owned_balance, pay_bill_multi_source, pay_bill_single_source, seed_demo_data, setup_database,
    transfer_multi_source, transfer_single_source, AccountNumber, BankConfig, ClientId,
    LedgerError, SignIn,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::Poisoned)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

enum ApiError {
    Ledger(LedgerError),
    UnknownLogin,
    Poisoned,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::InvalidCredential => StatusCode::UNAUTHORIZED,
        LedgerError::AccountNotOwned { .. } => StatusCode::FORBIDDEN,
        LedgerError::AmbiguousSource { .. } => StatusCode::CONFLICT,
        LedgerError::InsufficientFunds { .. } | LedgerError::BalanceOverflow { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        LedgerError::StorageUnavailable(_) | LedgerError::TransactionAborted(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(err) => {
                let status = status_for(&err);
                if err.is_storage_fault() {
                    tracing::error!(error = %err, "storage failure");
                } else {
                    tracing::warn!(error = %err, "request rejected");
                }
                (status, err.to_string())
            }
            ApiError::UnknownLogin => (StatusCode::UNAUTHORIZED, "unknown login".to_string()),
            ApiError::Poisoned => {
                tracing::error!("database mutex poisoned");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database unavailable".to_string(),
                )
            }
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    login: String,
    secret: String,
}

#[derive(Deserialize)]
struct BalanceRequest {
    login: String,
    secret: String,
    account_number: AccountNumber,
}

#[derive(Deserialize)]
struct TransferRequest {
    login: String,
    secret: String,
    receiver: AccountNumber,
    amount: i64,
    source: Option<AccountNumber>,
}

#[derive(Deserialize)]
struct BillRequest {
    login: String,
    secret: String,
    service: String,
    amount: i64,
    source: Option<AccountNumber>,
}

#[derive(Serialize)]
struct BalanceResponse {
    account_number: AccountNumber,
    balance: i64,
}

fn sign_in(conn: &Connection, login: &str, secret: &str) -> Result<ClientId, ApiError> {
    match authenticate(conn, login, secret)? {
        SignIn::Authenticated { client_id } => Ok(client_id),
        SignIn::UnknownLogin => Err(ApiError::UnknownLogin),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// POST /api/login - Check credentials
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let conn = state.conn()?;

    let client_id = sign_in(&conn, &req.login, &req.secret)?;
    Ok(ApiResponse::ok(SignIn::Authenticated { client_id }).into_response())
}

/// POST /api/balance - Balance of one of the caller's cards
async fn account_balance(
    State(state): State<AppState>,
    Json(req): Json<BalanceRequest>,
) -> Result<Response, ApiError> {
    let conn = state.conn()?;

    let client_id = sign_in(&conn, &req.login, &req.secret)?;
    let balance = owned_balance(&conn, client_id, req.account_number)?;
    Ok(ApiResponse::ok(BalanceResponse {
        account_number: req.account_number,
        balance,
    })
    .into_response())
}

/// POST /api/cards - The caller's cards
async fn client_cards(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let conn = state.conn()?;

    let client_id = sign_in(&conn, &req.login, &req.secret)?;
    Ok(ApiResponse::ok(list_cards(&conn, client_id)?).into_response())
}

/// GET /api/atms
async fn atms(State(state): State<AppState>) -> Result<Response, ApiError> {
    let conn = state.conn()?;
    Ok(ApiResponse::ok(list_atms(&conn)?).into_response())
}

/// GET /api/services
async fn services(State(state): State<AppState>) -> Result<Response, ApiError> {
    let conn = state.conn()?;
    Ok(ApiResponse::ok(list_services(&conn)?).into_response())
}

/// POST /api/transfers - Card-to-card transfer
async fn create_transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Response, ApiError> {
    let mut conn = state.conn()?;

    let client_id = sign_in(&conn, &req.login, &req.secret)?;
    let receipt = match choose_source(&conn, client_id, req.source)? {
        None => transfer_single_source(&mut conn, client_id, req.receiver, req.amount)?,
        Some(payer) => transfer_multi_source(&mut conn, payer, req.receiver, req.amount)?,
    };

    tracing::info!(transfer_id = %receipt.id, amount = receipt.amount, "transfer committed");
    Ok((StatusCode::CREATED, ApiResponse::ok(receipt)).into_response())
}

/// POST /api/bills - Bill payment
async fn pay_bill(
    State(state): State<AppState>,
    Json(req): Json<BillRequest>,
) -> Result<Response, ApiError> {
    let mut conn = state.conn()?;

    let client_id = sign_in(&conn, &req.login, &req.secret)?;
    let receipt = match choose_source(&conn, client_id, req.source)? {
        None => pay_bill_single_source(&mut conn, &req.service, client_id, req.amount)?,
        Some(payer) => pay_bill_multi_source(&mut conn, &req.service, payer, req.amount)?,
    };

    tracing::info!(transfer_id = %receipt.id, amount = receipt.amount, "bill paid");
    Ok((StatusCode::CREATED, ApiResponse::ok(receipt)).into_response())
}

// ============================================================================
// Main Server
// ============================================================================

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/balance", post(account_balance))
        .route("/cards", post(client_cards))
        .route("/atms", get(atms))
        .route("/services", get(services))
        .route("/transfers", post(create_transfer))
        .route("/bills", post(pay_bill))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CARD_LEDGER_CONFIG")
        .ok()
        .map(std::path::PathBuf::from);
    let config = BankConfig::load(config_path.as_deref())?;
    logging::init(&config.log_filter);

    let conn = open_store(&config.database_path, config.busy_timeout())?;
    setup_database(&conn)?;
    if config.seed_demo_data {
        seed_demo_data(&conn)?;
    }

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    let listener = tokio::net::TcpListener::bind(config.server_addr.as_str()).await?;
    tracing::info!(addr = %config.server_addr, "card ledger server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn demo_app() -> Router {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        seed_demo_data(&conn).unwrap();

        router(AppState {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_login_known_client() {
        let (status, body) = post_json(
            demo_app(),
            "/api/login",
            json!({ "login": "nilson", "secret": "password" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["client_id"], 3);
    }

    #[tokio::test]
    async fn test_login_unknown_client_is_a_failure() {
        let (status, body) = post_json(
            demo_app(),
            "/api/login",
            json!({ "login": "kayla", "secret": "password" }),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["error"], "unknown login");
    }

    #[tokio::test]
    async fn test_balance_requires_credentials() {
        let (status, body) = post_json(
            demo_app(),
            "/api/balance",
            json!({ "login": "jack", "secret": "password", "account_number": 2222 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["balance"], 2_000_000);

        let (status, body) = post_json(
            demo_app(),
            "/api/balance",
            json!({ "login": "jack", "secret": "wrong", "account_number": 2222 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_balance_of_foreign_card_is_forbidden() {
        let (status, body) = post_json(
            demo_app(),
            "/api/balance",
            json!({ "login": "paterson", "secret": "password", "account_number": 1111 }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_cards_lists_only_callers_cards() {
        let (status, body) = post_json(
            demo_app(),
            "/api/cards",
            json!({ "login": "jack", "secret": "password" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let numbers: Vec<i64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|card| card["account_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![1111, 2222]);

        let (status, _) = post_json(
            demo_app(),
            "/api/cards",
            json!({ "login": "kayla", "secret": "password" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cards_are_not_served_by_client_id() {
        let request = Request::builder()
            .uri("/api/clients/1/cards")
            .body(Body::empty())
            .unwrap();

        let response = demo_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
