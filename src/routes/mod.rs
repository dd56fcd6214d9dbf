pub mod applications;
pub mod auth;
pub mod bulk;
pub mod candidates;
pub mod dashboard;
pub mod health;
pub mod interviews;
pub mod jobs;
pub mod public;
pub mod webhook;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    config::get_config,
    middleware::{
        auth::{require_admin, require_bearer_auth},
        cors::permissive_cors,
        rate_limit::{new_rps_state, rps_middleware},
    },
    AppState,
};

pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Recruiter API: bearer token required on every route.
fn recruiter_routes() -> Router<AppState> {
    let admin = Router::new()
        .route(
            "/api/users",
            get(auth::list_users).post(auth::create_user),
        )
        .layer(axum::middleware::from_fn(require_admin));

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route("/api/dashboard/outbox", get(dashboard::outbox_status))
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/generate-description", post(jobs::generate_description))
        .route(
            "/api/jobs/:id",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/api/jobs/:id/status", post(jobs::transition_job))
        .route("/api/jobs/:id/history", get(jobs::job_history))
        .route("/api/jobs/:id/applications", get(jobs::job_applications))
        .route("/api/jobs/:id/export", get(jobs::export_applications))
        .route(
            "/api/candidates",
            get(candidates::list_candidates).post(candidates::create_candidate),
        )
        .route(
            "/api/candidates/:id",
            get(candidates::get_candidate).patch(candidates::update_candidate),
        )
        .route("/api/candidates/:id/archive", post(candidates::archive_candidate))
        .route("/api/candidates/:id/restore", post(candidates::restore_candidate))
        .route(
            "/api/candidates/:id/resume",
            get(candidates::download_resume).post(candidates::upload_resume),
        )
        .route(
            "/api/candidates/:id/applications",
            get(candidates::candidate_applications),
        )
        .route("/api/candidates/:id/messages", get(candidates::candidate_messages))
        .route("/api/candidates/:id/history", get(candidates::candidate_history))
        .route(
            "/api/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route("/api/applications/:id", get(applications::get_application))
        .route("/api/applications/:id/stage", post(applications::update_stage))
        .route("/api/applications/:id/rescore", post(applications::rescore_application))
        .route(
            "/api/applications/:id/evaluations",
            get(applications::application_evaluations),
        )
        .route(
            "/api/applications/:id/interviews",
            post(interviews::schedule_interview),
        )
        .route(
            "/api/applications/:id/screening-links",
            get(applications::application_screening_tokens),
        )
        .route("/api/screening-links", post(applications::issue_screening_token))
        .route(
            "/api/bulk-jobs",
            get(bulk::list_bulk_jobs).post(bulk::create_bulk_job),
        )
        .route("/api/bulk-jobs/:id", get(bulk::get_bulk_job))
        .route("/api/bulk-jobs/:id/candidates", get(bulk::list_drive_candidates))
        .route(
            "/api/drive-candidates/:id/import",
            post(bulk::import_drive_candidate),
        )
        .route(
            "/api/drive-candidates/:id/reject",
            post(bulk::reject_drive_candidate),
        )
        .route("/api/interviews", get(interviews::list_interviews))
        .route("/api/interviews/:id", get(interviews::get_interview))
        .route(
            "/api/interviews/:id/reschedule",
            post(interviews::reschedule_interview),
        )
        .route("/api/interviews/:id/cancel", post(interviews::cancel_interview))
        .route("/api/interviews/:id/complete", post(interviews::complete_interview))
        .route("/api/interviews/:id/ai-session", post(interviews::launch_ai_session))
        .route(
            "/api/interviews/:id/ai-session/sync",
            post(interviews::sync_ai_session),
        )
        .route(
            "/api/interviews/:id/evaluation",
            get(interviews::get_evaluation).post(interviews::evaluate_interview),
        )
        .nest_service("/api/uploads", ServeDir::new(&get_config().uploads_dir))
        .merge(admin)
        .layer(axum::middleware::from_fn(require_bearer_auth))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/public/jobs", get(public::list_public_jobs))
        .route("/api/public/jobs/:id", get(public::get_public_job))
        .route("/api/public/screening/:token", get(public::resolve_screening))
        .route(
            "/api/public/screening/:token/schedule",
            post(public::schedule_screening),
        )
        .route(
            "/api/public/screening/:token/start",
            post(public::start_screening),
        )
}

fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhook/email", post(webhook::handle_inbound_email))
}

/// The full application router, rate limited per surface.
pub fn app_router(state: AppState) -> Router {
    let config = get_config();

    let base_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready));

    let recruiter_api = recruiter_routes().layer(axum::middleware::from_fn_with_state(
        new_rps_state(config.api_rps),
        rps_middleware,
    ));
    let public_api = public_routes().layer(axum::middleware::from_fn_with_state(
        new_rps_state(config.public_rps),
        rps_middleware,
    ));
    let webhook_api = webhook_routes().layer(axum::middleware::from_fn_with_state(
        new_rps_state(config.public_rps),
        rps_middleware,
    ));

    base_routes
        .merge(recruiter_api)
        .merge(public_api)
        .merge(webhook_api)
        .with_state(state)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
