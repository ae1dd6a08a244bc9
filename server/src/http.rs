//! HTTP surface for quote requests and lookups.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use ratequote_common::{Currency, CurrencyPair, Quote, RequestId, RequestStatus};
use ratequote_store::{RequestStore, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RequestStore>,
    pub supported_currencies: Arc<Vec<Currency>>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/quotes/update", post(update_quote))
        .route("/quotes/latest", get(latest_quote))
        .route("/quotes/:id", get(quote_by_id))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UpdateQuoteBody {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

#[derive(Debug, Serialize)]
struct UpdateQuoteResponse {
    id: String,
    from: String,
    to: String,
    status: RequestStatus,
}

#[derive(Debug, Serialize)]
struct QuoteResponse {
    from: String,
    to: String,
    rate: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<Quote> for QuoteResponse {
    fn from(quote: Quote) -> Self {
        Self {
            from: quote.pair.from.code().to_string(),
            to: quote.pair.to.code().to_string(),
            rate: quote.rate,
            updated_at: quote.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Error response carrying the `{ error, message }` envelope.
struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation error", message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error.to_string(),
            message: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Validate raw currency inputs against the configured allow-list.
fn validate_pair(state: &AppState, from: &str, to: &str) -> Result<CurrencyPair, ApiError> {
    if from.trim().is_empty() {
        return Err(ApiError::validation("From currency is required"));
    }
    if to.trim().is_empty() {
        return Err(ApiError::validation("To currency is required"));
    }

    let from = Currency::new(from);
    let to = Currency::new(to);

    if from == to {
        return Err(ApiError::validation(
            "From and To currencies must be different",
        ));
    }

    for currency in [&from, &to] {
        if !state.supported_currencies.contains(currency) {
            let supported: Vec<&str> = state
                .supported_currencies
                .iter()
                .map(Currency::code)
                .collect();
            return Err(ApiError::validation(format!(
                "Currency '{}' is not supported. Supported currencies: {}",
                currency,
                supported.join(", ")
            )));
        }
    }

    Ok(CurrencyPair::new(from, to))
}

/// POST /quotes/update: request an asynchronous refresh for a pair.
async fn update_quote(
    State(state): State<AppState>,
    Json(body): Json<UpdateQuoteBody>,
) -> Result<Json<UpdateQuoteResponse>, ApiError> {
    let pair = validate_pair(&state, &body.from, &body.to)?;

    let request = state
        .store
        .create_or_get_pending(&pair)
        .await
        .map_err(|e| {
            error!(error = %e, pair = %pair, "Failed to create quote request");
            ApiError::internal("Failed to create quote request")
        })?;

    info!(
        request_id = %request.id,
        pair = %pair,
        status = %request.status,
        "Quote refresh requested"
    );

    Ok(Json(UpdateQuoteResponse {
        id: request.id.to_string(),
        from: pair.from.code().to_string(),
        to: pair.to.code().to_string(),
        status: request.status,
    }))
}

#[derive(Debug, Deserialize)]
struct LatestQuoteParams {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

/// GET /quotes/latest: latest resolved quote for a pair.
async fn latest_quote(
    State(state): State<AppState>,
    Query(params): Query<LatestQuoteParams>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let pair = validate_pair(&state, &params.from, &params.to)?;

    let quote = state.store.get_quote(&pair).await.map_err(|e| {
        if e.is_not_found() {
            ApiError::not_found(format!("Quote not found for currency pair: {pair}"))
        } else {
            error!(error = %e, pair = %pair, "Failed to get latest quote");
            ApiError::internal("Failed to get quote")
        }
    })?;

    Ok(Json(quote.into()))
}

/// GET /quotes/{id}: resolved quote for a completed refresh request.
async fn quote_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let id = RequestId::parse(&id)
        .map_err(|_| ApiError::validation("Request ID must be a valid UUID"))?;

    let request = state.store.get_request(id).await.map_err(|e| match e {
        StoreError::RequestNotFound(_) => ApiError::not_found("Quote request not found"),
        other => {
            error!(error = %other, request_id = %id, "Failed to get quote request");
            ApiError::internal("Failed to get quote request")
        }
    })?;

    if request.status != RequestStatus::Completed {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Request not completed",
            format!(
                "Quote request is not completed yet. Status: {}",
                request.status
            ),
        ));
    }

    let quote = state.store.get_quote(&request.pair).await.map_err(|e| {
        error!(error = %e, request_id = %id, pair = %request.pair, "Failed to get quote");
        ApiError::internal("Failed to get quote")
    })?;

    Ok(Json(quote.into()))
}

/// GET /health: liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "ratequote",
        "timestamp": Utc::now(),
    }))
}
