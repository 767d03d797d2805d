use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{ReparseResponse, StatementDetail, UploadRequest, UploadResponse};
use crate::models::statement::{InvalidPeriod, StatementDocument, StatementPeriod, StatementStats};
use crate::routes::ApiError;

/// POST /api/v1/statements — upload one month's statement and queue it for parsing.
///
/// Multipart fields: `statement_month` (`YYYY-MM`) and `statement_file`.
pub async fn upload_statement(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut statement_month: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("statement_month") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                statement_month = Some(text.trim().to_string());
            }
            Some("statement_file") => {
                let filename = field.file_name().unwrap_or("statement.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    let statement_month = statement_month
        .ok_or_else(|| ApiError::BadRequest("missing field: statement_month".to_string()))?;
    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("missing field: statement_file".to_string()))?;

    let request = UploadRequest {
        statement_month,
        filename,
    };
    request.validate()?;
    let period: StatementPeriod = request
        .statement_month
        .parse()
        .map_err(|e: InvalidPeriod| ApiError::BadRequest(e.to_string()))?;

    let response = state.review.upload(period, &request.filename, &bytes).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/v1/statements — all statements, newest period first.
pub async fn list_statements(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatementDocument>>, ApiError> {
    Ok(Json(state.review.list().await?))
}

/// GET /api/v1/statements/{id} — a statement with its records and stats.
pub async fn get_statement(
    State(state): State<AppState>,
    Path(statement_id): Path<Uuid>,
) -> Result<Json<StatementDetail>, ApiError> {
    Ok(Json(state.review.detail(statement_id).await?))
}

/// GET /api/v1/statements/{id}/stats — match counts and per-type totals.
pub async fn statement_stats(
    State(state): State<AppState>,
    Path(statement_id): Path<Uuid>,
) -> Result<Json<StatementStats>, ApiError> {
    Ok(Json(state.review.stats(statement_id).await?))
}

pub async fn delete_statement(
    State(state): State<AppState>,
    Path(statement_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.review.delete(statement_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/statements/{id}/reparse — drop existing records and parse again.
pub async fn reparse_statement(
    State(state): State<AppState>,
    Path(statement_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ReparseResponse>), ApiError> {
    let response = state.review.reparse(statement_id).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn complete_statement(
    State(state): State<AppState>,
    Path(statement_id): Path<Uuid>,
) -> Result<Json<StatementDocument>, ApiError> {
    Ok(Json(state.review.complete(statement_id).await?))
}
