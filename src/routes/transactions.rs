use axum::extract::{Path, State};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{
    CreateExpenseRequest, IgnoreRequest, MatchRequest, Suggestion, UpdateTypeRequest,
};
use crate::models::transaction::TransactionRecord;
use crate::routes::ApiError;

/// GET /api/v1/transactions/{id}/suggestions — ranked candidate expenses.
pub async fn suggestions(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    Ok(Json(state.review.suggestions(transaction_id).await?))
}

pub async fn match_expense(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<TransactionRecord>, ApiError> {
    request.validate()?;
    let record = state
        .review
        .match_expense(transaction_id, request.expense_id)
        .await?;
    Ok(Json(record))
}

pub async fn unmatch(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionRecord>, ApiError> {
    Ok(Json(state.review.unmatch(transaction_id).await?))
}

/// POST /api/v1/transactions/{id}/ignore — body `{"reason": "..."}`, reason optional.
pub async fn ignore(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<IgnoreRequest>,
) -> Result<Json<TransactionRecord>, ApiError> {
    request.validate()?;
    let record = state
        .review
        .ignore(transaction_id, request.reason.as_deref())
        .await?;
    Ok(Json(record))
}

/// POST /api/v1/transactions/{id}/create-expense — book a paid expense from the record.
pub async fn create_expense(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<Json<TransactionRecord>, ApiError> {
    request.validate()?;
    let record = state
        .review
        .create_expense(transaction_id, &request.vendor_name)
        .await?;
    Ok(Json(record))
}

pub async fn update_type(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<UpdateTypeRequest>,
) -> Result<Json<TransactionRecord>, ApiError> {
    let record = state
        .review
        .update_type(transaction_id, request.transaction_type)
        .await?;
    Ok(Json(record))
}
