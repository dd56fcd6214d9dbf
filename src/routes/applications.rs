use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{
        ApplicationListQuery, ApplicationListResponse, CreateApplicationPayload,
        UpdateStagePayload,
    },
    dto::screening_dto::{IssueTokenPayload, IssuedTokenResponse},
    error::{Error, Result},
    middleware::auth::Claims,
    models::application::ApplicationStage,
    models::screening_token::ScreeningPurpose,
    AppState,
};

/// Creates the application and, unless `score` is false, scores it right away.
/// A scoring failure leaves the application unscored and is reported alongside it.
#[axum::debug_handler]
pub async fn create_application(
    State(state): State<AppState>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state
        .application_service
        .apply(payload.candidate_id, payload.job_id)
        .await?;

    if !payload.score {
        return Ok((StatusCode::CREATED, Json(json!({ "application": application }))));
    }
    match state
        .application_service
        .rescore(application.id, &state.ai_service)
        .await
    {
        Ok(scored) => Ok((StatusCode::CREATED, Json(json!({ "application": scored })))),
        Err(e) => {
            tracing::warn!(application_id = %application.id, error = %e, "initial scoring failed");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "application": application, "scoring_error": e.to_string() })),
            ))
        }
    }
}

#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.application_service.list(query).await?;
    Ok(Json(ApplicationListResponse::from(result)))
}

#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = state.application_service.get_summary(id).await?;
    Ok(Json(summary))
}

#[axum::debug_handler]
pub async fn update_stage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let to: ApplicationStage = payload.stage.parse().map_err(Error::BadRequest)?;
    let application = state
        .application_service
        .update_stage(id, to, claims.user_id())
        .await?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn rescore_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .rescore(id, &state.ai_service)
        .await?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn application_evaluations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.application_service.get(id).await?;
    let items = state.evaluation_service.list_for_application(id).await?;
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn issue_screening_token(
    State(state): State<AppState>,
    Json(payload): Json<IssueTokenPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let purpose: ScreeningPurpose = payload.purpose.parse().map_err(Error::BadRequest)?;
    let (token, link) = state
        .screening_service
        .issue(payload.application_id, purpose, payload.ttl_hours, payload.send_email)
        .await?;
    Ok((StatusCode::CREATED, Json(IssuedTokenResponse { token, link })))
}

#[axum::debug_handler]
pub async fn application_screening_tokens(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.application_service.get(id).await?;
    let items = state.screening_service.for_application(id).await?;
    Ok(Json(items))
}
