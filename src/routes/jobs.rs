use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::JobSnapshot;
use crate::routes::ApiError;

/// GET /api/v1/jobs/{id} — poll a background job until it is terminal.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, ApiError> {
    Ok(Json(state.review.job(job_id).await?))
}
