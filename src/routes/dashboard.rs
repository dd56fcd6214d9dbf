use axum::{extract::State, response::IntoResponse, Json};

use crate::{error::Result, AppState};

#[axum::debug_handler]
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.stats_service.dashboard().await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn outbox_status(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let pending = state.email_service.pending_count().await?;
    Ok(Json(serde_json::json!({ "pending": pending })))
}
