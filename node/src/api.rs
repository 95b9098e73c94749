//! # REST API
//!
//! Builds the axum router that the browser demo talks to. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                                    | Description                  |
//! |--------|-----------------------------------------|------------------------------|
//! | GET    | `/health`                               | Liveness probe               |
//! | POST   | `/api/generate_key`                     | Run BB84, open a session     |
//! | POST   | `/api/process_transaction`              | Encrypt/decrypt a transfer   |
//! | GET    | `/api/transaction_status/:transaction_id` | Session and transaction view |
//!
//! Errors are `{ "error": "<message>" }` with a status taken from
//! [`ServiceError`]. Malformed or incomplete bodies are validation errors
//! (400), never a framework rejection.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use qupi_protocol::qkd::Basis;
use qupi_protocol::transaction::{Amount, AmountError, Transaction, TransactionStatus};
use qupi_protocol::{KeyGeneration, ServiceError, TransactionService, TransactionView};

use crate::metrics::NodeMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The handshake service. Owns the session store.
    pub service: Arc<TransactionService>,
    /// Prometheus handles for in-handler recording.
    pub metrics: Arc<NodeMetrics>,
}

impl AppState {
    /// Counts a rejected request and converts the error for the response.
    fn rejected(&self, err: impl Into<ApiError>) -> ApiError {
        self.metrics.requests_rejected_total.inc();
        err.into()
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate_key", post(generate_key_handler))
        .route("/api/process_transaction", post(process_transaction_handler))
        .route(
            "/api/transaction_status/:transaction_id",
            get(transaction_status_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Body of `POST /api/generate_key`. Fields are optional so a missing one
/// surfaces as a validation error.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateKeyRequest {
    pub sender: Option<String>,
    pub receiver: Option<String>,
}

/// Body of `POST /api/process_transaction`.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessTransactionRequest {
    pub transaction_id: Option<String>,
    pub amount: Option<AmountInput>,
}

/// The browser sends `parseFloat(...)`, but hand-written clients often send
/// a string. Both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    pub fn to_amount(&self) -> Result<Amount, AmountError> {
        match self {
            Self::Number(value) => Amount::from_major(*value),
            Self::Text(text) => Amount::parse(text),
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// The raw BB84 exchange, bits as 0/1 and bases as `"+"`/`"x"`.
#[derive(Debug, Serialize, Deserialize)]
pub struct QkdDetails {
    pub alice_bits: Vec<u8>,
    pub alice_bases: Vec<Basis>,
    pub bob_bases: Vec<Basis>,
    pub bob_results: Vec<u8>,
    pub shared_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateKeyResponse {
    pub transaction_id: String,
    pub shared_key_length: usize,
    pub matching_bases_percentage: f64,
    pub qkd_details: QkdDetails,
}

impl From<&KeyGeneration> for GenerateKeyResponse {
    fn from(kg: &KeyGeneration) -> Self {
        let m = &kg.material;
        Self {
            transaction_id: kg.transaction_id.clone(),
            shared_key_length: m.sifted_key.len(),
            matching_bases_percentage: m.matching_bases_percentage(),
            qkd_details: QkdDetails {
                alice_bits: as_digits(&m.alice_bits),
                alice_bases: m.alice_bases.clone(),
                bob_bases: m.bob_bases.clone(),
                bob_results: as_digits(&m.bob_measurements),
                shared_key: as_digits(&m.sifted_key),
            },
        }
    }
}

/// What the demo shows about the encryption round-trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct SimulationDetails {
    pub original_message: String,
    /// Hex of the first bytes of the sealed payload.
    pub encrypted_sample: String,
    pub decryption_successful: bool,
}

/// Session summary returned by the status endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub sender: String,
    pub receiver: String,
    /// Rupees; null until processed.
    pub amount: Option<f64>,
    pub status: TransactionStatus,
    /// Null until processed.
    pub encrypted_length: Option<usize>,
}

/// Shared shape of the process and status responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decrypted_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TransactionDetails>,
}

impl TransactionResponse {
    /// Response for `process_transaction`.
    pub fn processed(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.transaction_id.clone(),
            status: tx.status,
            encrypted_data_length: Some(tx.encrypted_len()),
            decrypted_data: Some(tx.decrypted_payload.clone()),
            simulation: Some(SimulationDetails {
                original_message: tx.original_message.clone(),
                encrypted_sample: tx.encrypted_sample(),
                decryption_successful: tx.decryption_successful,
            }),
            details: None,
        }
    }

    /// Response for `transaction_status`.
    pub fn from_view(view: &TransactionView) -> Self {
        match view {
            TransactionView::Processed(tx) => Self {
                details: Some(TransactionDetails {
                    sender: tx.sender.clone(),
                    receiver: tx.receiver.clone(),
                    amount: Some(tx.amount.as_major()),
                    status: tx.status,
                    encrypted_length: Some(tx.encrypted_len()),
                }),
                ..Self::processed(tx)
            },
            TransactionView::KeyGenerated {
                transaction_id,
                sender,
                receiver,
                ..
            } => Self {
                transaction_id: transaction_id.clone(),
                status: TransactionStatus::KeyGenerated,
                encrypted_data_length: None,
                decrypted_data: None,
                simulation: None,
                details: Some(TransactionDetails {
                    sender: sender.clone(),
                    receiver: receiver.clone(),
                    amount: None,
                    status: TransactionStatus::KeyGenerated,
                    encrypted_length: None,
                }),
            },
        }
    }
}

/// Error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn as_digits(bits: &[bool]) -> Vec<u8> {
    bits.iter().map(|&b| u8::from(b)).collect()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A [`ServiceError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<AmountError> for ApiError {
    fn from(err: AmountError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl ApiError {
    fn validation(message: &str) -> Self {
        Self(ServiceError::Validation(message.to_string()))
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidState { .. } => StatusCode::CONFLICT,
            ServiceError::InsufficientEntropy => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Qkd(_) | ServiceError::Store(_) | ServiceError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `POST /api/generate_key`: runs a BB84 exchange and opens a session.
async fn generate_key_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateKeyRequest>, JsonRejection>,
) -> Result<Json<GenerateKeyResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| state.rejected(e))?;
    let (Some(sender), Some(receiver)) = (req.sender, req.receiver) else {
        return Err(state.rejected(ApiError::validation(
            "Sender and receiver are required",
        )));
    };

    let kg = state
        .service
        .generate_key(&sender, &receiver)
        .map_err(|e| state.rejected(e))?;

    state.metrics.keys_generated_total.inc();
    state
        .metrics
        .sifted_key_length
        .observe(kg.material.sifted_key.len() as f64);

    Ok(Json(GenerateKeyResponse::from(&kg)))
}

/// `POST /api/process_transaction`: encrypts and decrypts the transfer
/// under the session's key.
async fn process_transaction_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProcessTransactionRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| state.rejected(e))?;
    let (Some(transaction_id), Some(amount)) = (req.transaction_id, req.amount) else {
        return Err(state.rejected(ApiError::validation(
            "Transaction ID and amount are required",
        )));
    };
    let amount = amount.to_amount().map_err(|e| state.rejected(e))?;

    let started = Instant::now();
    let tx = state
        .service
        .process_amount(&transaction_id, amount)
        .map_err(|e| state.rejected(e))?;
    state
        .metrics
        .transaction_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match tx.status {
        TransactionStatus::Completed => state.metrics.transactions_completed_total.inc(),
        TransactionStatus::Failed => state.metrics.transactions_failed_total.inc(),
        _ => {}
    }

    Ok(Json(TransactionResponse::processed(&tx)))
}

/// `GET /api/transaction_status/:transaction_id`: current view of a session.
async fn transaction_status_handler(
    Path(transaction_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let view = state
        .service
        .get_status(&transaction_id)
        .map_err(|e| state.rejected(e))?;
    Ok(Json(TransactionResponse::from_view(&view)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use qupi_protocol::config::ServiceConfig;
    use qupi_protocol::qkd::SeededBitSource;
    use tower::ServiceExt;

    fn test_app_state() -> AppState {
        let service = TransactionService::new(
            ServiceConfig::default(),
            Arc::new(SeededBitSource::new(42)),
        )
        .expect("valid config");

        AppState {
            version: "0.1.0-test".into(),
            service: Arc::new(service),
            metrics: Arc::new(NodeMetrics::new().expect("metrics")),
        }
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with a raw body and returns (status, body_bytes).
    async fn post_raw(router: &Router, path: &str, body: Vec<u8>) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        post_raw(router, path, serde_json::to_vec(&body).unwrap()).await
    }

    async fn generate(router: &Router) -> GenerateKeyResponse {
        let (status, body) = post_json(
            router,
            "/api/generate_key",
            serde_json::json!({ "sender": "alice@bank", "receiver": "bob@bank" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    fn error_of(body: &[u8]) -> String {
        serde_json::from_slice::<ErrorResponse>(body).unwrap().error
    }

    // -- Health ---------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0-test");
    }

    // -- generate_key ---------------------------------------------------------

    #[tokio::test]
    async fn generate_key_returns_full_exchange() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/api/generate_key",
            serde_json::json!({ "sender": "alice@bank", "receiver": "bob@bank" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["transaction_id"].as_str().unwrap().starts_with("TXN-"));

        let details = &json["qkd_details"];
        for field in ["alice_bits", "alice_bases", "bob_bases", "bob_results"] {
            assert_eq!(details[field].as_array().unwrap().len(), 64, "{field}");
        }
        for base in details["alice_bases"].as_array().unwrap() {
            let symbol = base.as_str().unwrap();
            assert!(symbol == "+" || symbol == "x");
        }
        for bit in details["alice_bits"].as_array().unwrap() {
            assert!(bit == 0 || bit == 1);
        }

        let shared = details["shared_key"].as_array().unwrap().len();
        assert_eq!(json["shared_key_length"], shared);
        let pct = json["matching_bases_percentage"].as_f64().unwrap();
        assert!((pct - shared as f64 / 64.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn generate_key_missing_sender_is_400() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, body) = post_json(
            &router,
            "/api/generate_key",
            serde_json::json!({ "receiver": "bob@bank" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&body), "Sender and receiver are required");

        let (status, _) = post_json(
            &router,
            "/api/generate_key",
            serde_json::json!({ "sender": "", "receiver": "bob@bank" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(metrics.requests_rejected_total.get(), 2);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let router = create_router(test_app_state());
        let (status, body) = post_raw(&router, "/api/generate_key", b"{not json".to_vec()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_of(&body).starts_with("Invalid request body"));
    }

    /// Alternates 0, 1, 0, ... so a one-position exchange never matches.
    #[derive(Default)]
    struct AlternatingBitSource {
        draws: std::sync::atomic::AtomicU64,
    }

    impl qupi_protocol::qkd::BitSource for AlternatingBitSource {
        fn next_bit(&self) -> bool {
            self.draws
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
                % 2
                == 1
        }
    }

    #[tokio::test]
    async fn generate_key_without_sifted_bits_is_503() {
        let config = ServiceConfig {
            qkd_key_length: 1,
            ..ServiceConfig::default()
        };
        let service =
            TransactionService::new(config, Arc::new(AlternatingBitSource::default())).unwrap();
        let state = AppState {
            version: "0.1.0-test".into(),
            service: Arc::new(service),
            metrics: Arc::new(NodeMetrics::new().expect("metrics")),
        };
        let service = Arc::clone(&state.service);
        let router = create_router(state);

        let (status, body) = post_json(
            &router,
            "/api/generate_key",
            serde_json::json!({ "sender": "alice@bank", "receiver": "bob@bank" }),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(error_of(&body).contains("insufficient entropy"));
        assert_eq!(service.session_count(), 0);
    }

    // -- process_transaction --------------------------------------------------

    #[tokio::test]
    async fn process_transaction_completes() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);
        let kg = generate(&router).await;

        let (status, body) = post_json(
            &router,
            "/api/process_transaction",
            serde_json::json!({ "transaction_id": kg.transaction_id, "amount": 150.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let resp: TransactionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.transaction_id, kg.transaction_id);
        assert_eq!(resp.status, TransactionStatus::Completed);

        let sim = resp.simulation.unwrap();
        assert!(sim.decryption_successful);
        assert!(sim.original_message.contains("\"amount\":\"150.00\""));
        assert_eq!(sim.encrypted_sample.len(), 40);
        assert_eq!(resp.decrypted_data.as_deref(), Some(sim.original_message.as_str()));
        assert_eq!(
            resp.encrypted_data_length,
            Some(12 + sim.original_message.len() + 16)
        );
        assert!(resp.details.is_none());

        assert_eq!(metrics.transactions_completed_total.get(), 1);
        assert_eq!(metrics.transaction_latency_seconds.get_sample_count(), 1);
    }

    #[tokio::test]
    async fn amount_may_be_a_string() {
        let router = create_router(test_app_state());
        let kg = generate(&router).await;

        let (status, body) = post_json(
            &router,
            "/api/process_transaction",
            serde_json::json!({ "transaction_id": kg.transaction_id, "amount": "99.5" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let resp: TransactionResponse = serde_json::from_slice(&body).unwrap();
        assert!(resp
            .simulation
            .unwrap()
            .original_message
            .contains("\"amount\":\"99.50\""));
    }

    #[tokio::test]
    async fn process_unknown_id_is_404() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/api/process_transaction",
            serde_json::json!({ "transaction_id": "unknown-id", "amount": 10.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(error_of(&body).contains("unknown-id"));
    }

    #[tokio::test]
    async fn process_bad_amount_is_400() {
        let router = create_router(test_app_state());
        let kg = generate(&router).await;

        for amount in [
            serde_json::json!(0),
            serde_json::json!(-5),
            serde_json::json!("lots"),
        ] {
            let (status, _) = post_json(
                &router,
                "/api/process_transaction",
                serde_json::json!({ "transaction_id": kg.transaction_id, "amount": amount }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
        }

        let (status, body) = post_json(
            &router,
            "/api/process_transaction",
            serde_json::json!({ "transaction_id": kg.transaction_id }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&body), "Transaction ID and amount are required");
    }

    #[tokio::test]
    async fn process_twice_is_409() {
        let router = create_router(test_app_state());
        let kg = generate(&router).await;
        let body = serde_json::json!({ "transaction_id": kg.transaction_id, "amount": 10 });

        let (first, _) = post_json(&router, "/api/process_transaction", body.clone()).await;
        let (second, _) = post_json(&router, "/api/process_transaction", body).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::CONFLICT);
    }

    // -- transaction_status ---------------------------------------------------

    #[tokio::test]
    async fn status_before_processing_is_key_generated() {
        let router = create_router(test_app_state());
        let kg = generate(&router).await;

        let (status, body) = get(
            &router,
            &format!("/api/transaction_status/{}", kg.transaction_id),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "key_generated");
        assert!(json.get("simulation").is_none());
        assert!(json.get("encrypted_data_length").is_none());
        assert_eq!(json["details"]["sender"], "alice@bank");
        assert!(json["details"]["amount"].is_null());
        assert!(json["details"]["encrypted_length"].is_null());
    }

    #[tokio::test]
    async fn status_after_processing_has_details() {
        let router = create_router(test_app_state());
        let kg = generate(&router).await;
        post_json(
            &router,
            "/api/process_transaction",
            serde_json::json!({ "transaction_id": kg.transaction_id, "amount": 150 }),
        )
        .await;

        let (status, body) = get(
            &router,
            &format!("/api/transaction_status/{}", kg.transaction_id),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let resp: TransactionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.status, TransactionStatus::Completed);
        assert!(resp.simulation.unwrap().decryption_successful);

        let details = resp.details.unwrap();
        assert_eq!(details.amount, Some(150.0));
        assert_eq!(details.status, TransactionStatus::Completed);
        assert_eq!(details.encrypted_length, resp.encrypted_data_length);
    }

    #[tokio::test]
    async fn status_unknown_id_is_404() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/api/transaction_status/TXN-missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(error_of(&body).contains("TXN-missing"));
    }

    // -- Error mapping --------------------------------------------------------

    #[test]
    fn error_status_mapping() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::InvalidState {
                    transaction_id: "x".into(),
                    current: TransactionStatus::Completed,
                    expected: TransactionStatus::KeyGenerated,
                },
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::InsufficientEntropy,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }
}
