use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{
        AiSessionResponse, CancelInterviewPayload, CompleteInterviewPayload, InterviewDetail,
        InterviewListQuery, RescheduleInterviewPayload, ScheduleInterviewPayload,
    },
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<ScheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let interview = state
        .interview_service
        .schedule(application_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Query(query): Query<InterviewListQuery>,
) -> Result<impl IntoResponse> {
    let items = state.interview_service.list(query).await?;
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interview = state.interview_service.get(id).await?;
    let evaluation = state.evaluation_service.find(id).await?;
    Ok(Json(InterviewDetail {
        ends_at: interview.ends_at(),
        interview,
        evaluation,
    }))
}

#[axum::debug_handler]
pub async fn reschedule_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let interview = state.interview_service.reschedule(id, payload).await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn cancel_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelInterviewPayload>>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.unwrap_or_default();
    let interview = state
        .interview_service
        .cancel(id, payload.notify_candidate, payload.reason.as_deref())
        .await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn complete_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CompleteInterviewPayload>>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.unwrap_or_default();
    let interview = state
        .interview_service
        .complete(id, payload.transcript)
        .await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn launch_ai_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interview = state.interview_service.launch_ai_session(id).await?;
    Ok(Json(AiSessionResponse {
        session_url: interview.session_url.clone(),
        interview,
        evaluation: None,
    }))
}

#[axum::debug_handler]
pub async fn sync_ai_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (interview, evaluation) = state
        .interview_service
        .sync_ai_session(id, &state.evaluation_service)
        .await?;
    Ok(Json(AiSessionResponse {
        session_url: interview.session_url.clone(),
        interview,
        evaluation,
    }))
}

#[axum::debug_handler]
pub async fn evaluate_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interview = state.interview_service.get(id).await?;
    let evaluation = state
        .evaluation_service
        .evaluate(&interview, &state.ai_service)
        .await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}

#[axum::debug_handler]
pub async fn get_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let evaluation = state.evaluation_service.get(id).await?;
    Ok(Json(evaluation))
}
