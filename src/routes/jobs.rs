use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{
        CreateJobPayload, GenerateJobDescriptionPayload, JobListQuery, JobListResponse,
        JobResponse, TransitionJobPayload, UpdateJobPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::job::JobStatus,
    services::export_service::{ExportService, XLSX_CONTENT_TYPE},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job created", body = Json<JobResponse>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.create(payload, claims.user_id()).await?;
    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("department" = Option<String>, Query, description = "Filter by department"),
        ("search" = Option<String>, Query, description = "Search in title and description")
    ),
    responses(
        (status = 200, description = "List of jobs", body = Json<JobListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.job_service.list(query).await?;
    Ok(Json(JobListResponse::from(result)))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job found", body = Json<JobResponse>),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_by_id(id).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    patch,
    path = "/api/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    request_body = UpdateJobPayload,
    responses(
        (status = 200, description = "Job updated", body = Json<JobResponse>),
        (status = 409, description = "Job is closed or dropped")
    )
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.update(id, payload).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/status",
    params(("id" = Uuid, Path, description = "Job ID")),
    request_body = TransitionJobPayload,
    responses(
        (status = 200, description = "Status changed", body = Json<JobResponse>),
        (status = 409, description = "Transition not allowed")
    )
)]
#[axum::debug_handler]
pub async fn transition_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionJobPayload>,
) -> Result<impl IntoResponse> {
    let to: JobStatus = payload.status.parse().map_err(Error::BadRequest)?;
    let job = state.job_service.transition(id, to, claims.user_id()).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 204, description = "Draft deleted"),
        (status = 409, description = "Only drafts can be deleted")
    )
)]
#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.job_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn job_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.job_service.get_by_id(id).await?;
    let entries = state.job_service.history(id).await?;
    Ok(Json(entries))
}

#[axum::debug_handler]
pub async fn job_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.job_service.get_by_id(id).await?;
    let items = state.application_service.for_job(id).await?;
    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/api/jobs/generate-description",
    request_body = GenerateJobDescriptionPayload,
    responses(
        (status = 200, description = "Generated description")
    )
)]
#[axum::debug_handler]
pub async fn generate_description(
    State(state): State<AppState>,
    Json(payload): Json<GenerateJobDescriptionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let description = state.ai_service.generate_job_description(&payload).await;
    Ok(Json(json!({
        "description": description,
        "generated_by_ai": state.ai_service.uses_llm(),
    })))
}

#[axum::debug_handler]
pub async fn export_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_by_id(id).await?;
    let applications = state.application_service.for_job(id).await?;
    let buffer = ExportService::generate_applications_xlsx(&job, &applications)?;
    let disposition = format!("attachment; filename=\"{}\"", ExportService::file_name(&job));
    tracing::info!(job_id = %id, rows = applications.len(), "applications exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
