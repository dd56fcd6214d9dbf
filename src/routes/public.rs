use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{JobPublicListResponse, JobPublicQuery, JobPublicSummary, JobResponse},
    dto::screening_dto::PublicSchedulePayload,
    error::Result,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/public/jobs",
    params(("limit" = Option<i64>, Query, description = "Maximum number of jobs")),
    responses(
        (status = 200, description = "Open positions", body = Json<JobPublicListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_public_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobPublicQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let items = state
        .job_service
        .list_active(limit)
        .await?
        .into_iter()
        .map(JobPublicSummary::from)
        .collect();
    Ok(Json(JobPublicListResponse { items }))
}

#[axum::debug_handler]
pub async fn get_public_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_active(id).await?;
    Ok(Json(JobResponse::from(job)))
}

#[axum::debug_handler]
pub async fn resolve_screening(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse> {
    let info = state.screening_service.resolve(&token).await?;
    Ok(Json(info))
}

#[axum::debug_handler]
pub async fn schedule_screening(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<PublicSchedulePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let interview = state.screening_service.schedule(&token, payload).await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

#[axum::debug_handler]
pub async fn start_screening(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse> {
    let interview = state.screening_service.start(&token).await?;
    Ok((StatusCode::CREATED, Json(interview)))
}
