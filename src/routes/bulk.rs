use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::bulk_dto::{BulkJobListQuery, BulkJobProgress, DriveCandidateListResponse, ImportResponse},
    error::{Error, Result},
    middleware::auth::Claims,
    models::bulk_job::MAX_FILES_PER_BULK_JOB,
    services::bulk_service::UploadedFile,
    utils::files::sanitize_file_name,
    AppState,
};

/// Multipart form: a `job_id` text field and one or more `files` parts.
#[axum::debug_handler]
pub async fn create_bulk_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut job_id: Option<Uuid> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "job_id" => {
                let raw = field.text().await?;
                job_id = Some(
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| Error::BadRequest("job_id must be a UUID".to_string()))?,
                );
            }
            "files" | "files[]" | "file" => {
                if uploads.len() >= MAX_FILES_PER_BULK_JOB {
                    return Err(Error::BadRequest(format!(
                        "At most {} files per batch",
                        MAX_FILES_PER_BULK_JOB
                    )));
                }
                let file_name = sanitize_file_name(field.file_name().unwrap_or("resume"));
                let data = field.bytes().await?;
                uploads.push(UploadedFile { file_name, data });
            }
            _ => {}
        }
    }

    let job_id = job_id.ok_or_else(|| Error::BadRequest("Missing job_id field".to_string()))?;
    let bulk_job = state
        .bulk_service
        .create(job_id, uploads, claims.user_id())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(BulkJobProgress::from(bulk_job))))
}

#[axum::debug_handler]
pub async fn list_bulk_jobs(
    State(state): State<AppState>,
    Query(query): Query<BulkJobListQuery>,
) -> Result<impl IntoResponse> {
    let items: Vec<BulkJobProgress> = state
        .bulk_service
        .list(query.job_id, query.limit.unwrap_or(20))
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn get_bulk_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let bulk_job = state.bulk_service.get(id).await?;
    Ok(Json(BulkJobProgress::from(bulk_job)))
}

#[axum::debug_handler]
pub async fn list_drive_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let bulk_job = state.bulk_service.get(id).await?;
    let items = state.bulk_service.drive_candidates(id).await?;
    Ok(Json(DriveCandidateListResponse {
        bulk_job: bulk_job.into(),
        items,
    }))
}

#[axum::debug_handler]
pub async fn import_drive_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (drive_candidate, candidate, application, created_candidate) =
        state.bulk_service.import(id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            drive_candidate,
            candidate,
            application,
            created_candidate,
        }),
    ))
}

#[axum::debug_handler]
pub async fn reject_drive_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let drive_candidate = state.bulk_service.reject(id).await?;
    Ok(Json(drive_candidate))
}
