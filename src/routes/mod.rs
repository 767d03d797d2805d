use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::services::review::ReviewError;

pub mod health;
pub mod jobs;
pub mod metrics;
pub mod statements;
pub mod transactions;

/// Largest accepted request body (statement uploads).
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Error type for JSON endpoints. Renders as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Review(ReviewError),
    BadRequest(String),
}

impl From<ReviewError> for ApiError {
    fn from(e: ReviewError) -> Self {
        ApiError::Review(e)
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::BadRequest(report.to_string())
    }
}

fn review_status(e: &ReviewError) -> StatusCode {
    match e {
        ReviewError::StatementNotFound(_)
        | ReviewError::TransactionNotFound(_)
        | ReviewError::ExpenseNotFound(_)
        | ReviewError::JobNotFound(_) => StatusCode::NOT_FOUND,
        ReviewError::Conflict(_) => StatusCode::CONFLICT,
        ReviewError::Invalid(_) => StatusCode::BAD_REQUEST,
        ReviewError::Database(_) | ReviewError::Storage(_) | ReviewError::Queue(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Review(e) => {
                let status = review_status(e);
                if status.is_server_error() {
                    tracing::error!(error = %e, "Request failed");
                    (status, "internal server error".to_string())
                } else {
                    (status, e.to_string())
                }
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// The full HTTP surface: JSON API, health and Prometheus scrape endpoint.
pub fn router(state: AppState, prometheus_handle: Arc<PrometheusHandle>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/v1/statements",
            post(statements::upload_statement).get(statements::list_statements),
        )
        .route(
            "/api/v1/statements/{id}",
            get(statements::get_statement).delete(statements::delete_statement),
        )
        .route(
            "/api/v1/statements/{id}/stats",
            get(statements::statement_stats),
        )
        .route(
            "/api/v1/statements/{id}/reparse",
            post(statements::reparse_statement),
        )
        .route(
            "/api/v1/statements/{id}/complete",
            post(statements::complete_statement),
        )
        .route(
            "/api/v1/transactions/{id}/suggestions",
            get(transactions::suggestions),
        )
        .route("/api/v1/transactions/{id}/match", post(transactions::match_expense))
        .route("/api/v1/transactions/{id}/unmatch", post(transactions::unmatch))
        .route("/api/v1/transactions/{id}/ignore", post(transactions::ignore))
        .route(
            "/api/v1/transactions/{id}/create-expense",
            post(transactions::create_expense),
        )
        .route("/api/v1/transactions/{id}/type", post(transactions::update_type))
        .route("/api/v1/jobs/{id}", get(jobs::get_job))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
