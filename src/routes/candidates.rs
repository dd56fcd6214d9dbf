use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use tokio_util::io::ReaderStream;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::candidate_dto::{
        CandidateListQuery, CandidateListResponse, CreateCandidatePayload, UpdateCandidatePayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::candidate::CandidateSource,
    utils::files::{resolve_upload, sanitize_file_name, MAX_UPLOAD_BYTES},
    AppState,
};

#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCandidatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state
        .candidate_service
        .create(payload.into(), CandidateSource::Manual)
        .await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.candidate_service.list(query).await?;
    Ok(Json(CandidateListResponse::from(result)))
}

#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    Ok(Json(candidate))
}

#[axum::debug_handler]
pub async fn update_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCandidatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state.candidate_service.update(id, payload).await?;
    Ok(Json(candidate))
}

#[axum::debug_handler]
pub async fn archive_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.archive(id, claims.user_id()).await?;
    Ok(Json(candidate))
}

#[axum::debug_handler]
pub async fn restore_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.restore(id, claims.user_id()).await?;
    Ok(Json(candidate))
}

/// Multipart upload with a single `resume` (or `file`) field.
#[axum::debug_handler]
pub async fn upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut data = None;
    while let Some(field) = multipart.next_field().await? {
        if matches!(field.name(), Some("resume") | Some("file")) {
            let bytes = field.bytes().await?;
            if bytes.len() > MAX_UPLOAD_BYTES {
                return Err(Error::BadRequest("Resume is too large".to_string()));
            }
            data = Some(bytes);
            break;
        }
    }
    let data = data.ok_or_else(|| Error::BadRequest("Missing 'resume' file field".to_string()))?;
    let candidate = state.candidate_service.attach_resume(id, data).await?;
    Ok(Json(candidate))
}

#[axum::debug_handler]
pub async fn download_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    let relative = candidate
        .resume_path
        .ok_or_else(|| Error::NotFound("Candidate has no resume".to_string()))?;
    let path = resolve_upload(&relative)?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound("Stored file not found".to_string()),
        _ => Error::Io(e),
    })?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("bin");
    let content_type = match extension {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    };
    let file_name = sanitize_file_name(&format!("{}.{}", candidate.name, extension));
    let disposition = format!("attachment; filename=\"{}\"", file_name);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    ))
}

#[axum::debug_handler]
pub async fn candidate_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.candidate_service.get(id).await?;
    let items = state.application_service.for_candidate(id).await?;
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn candidate_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let items = state.candidate_service.messages(id).await?;
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn candidate_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let items = state.candidate_service.history(id).await?;
    Ok(Json(items))
}
