pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    ai_interview_client::AiInterviewClient, ai_service::AIService,
    application_service::ApplicationService, bulk_service::BulkService,
    candidate_service::CandidateService, email_service::{EmailService, MailTransport},
    evaluation_service::EvaluationService, interview_service::InterviewService,
    job_service::JobService, maintenance::Maintenance, screening_service::ScreeningService,
    stats_service::StatsService, user_service::UserService,
};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub ai_service: AIService,
    pub job_service: JobService,
    pub candidate_service: CandidateService,
    pub application_service: ApplicationService,
    pub bulk_service: BulkService,
    pub email_service: EmailService,
    pub interview_service: InterviewService,
    pub evaluation_service: EvaluationService,
    pub screening_service: ScreeningService,
    pub user_service: UserService,
    pub stats_service: StatsService,
}

impl AppState {
    pub fn new(pool: PgPool) -> error::Result<Self> {
        Self::with_transport(pool, EmailService::transport_from_config())
    }

    /// Same wiring with a caller-supplied mail transport.
    pub fn with_transport(pool: PgPool, transport: Arc<dyn MailTransport>) -> error::Result<Self> {
        let config = config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let ai_service = AIService::new(config, http_client.clone());
        let ai_interviews = AiInterviewClient::new(
            config.ai_interview_api_url.as_deref(),
            config.ai_interview_api_key.clone(),
            http_client,
        );
        let email_service = EmailService::new(pool.clone(), transport);
        let interview_service =
            InterviewService::new(pool.clone(), email_service.clone(), ai_interviews);
        let screening_service = ScreeningService::new(
            pool.clone(),
            interview_service.clone(),
            email_service.clone(),
        );

        Ok(Self {
            ai_service,
            job_service: JobService::new(pool.clone()),
            candidate_service: CandidateService::new(pool.clone()),
            application_service: ApplicationService::new(pool.clone()),
            bulk_service: BulkService::new(pool.clone()),
            evaluation_service: EvaluationService::new(pool.clone()),
            user_service: UserService::new(pool.clone()),
            stats_service: StatsService::new(pool.clone(), interview_service.clone()),
            email_service,
            interview_service,
            screening_service,
            pool,
        })
    }

    pub fn maintenance(&self) -> Maintenance {
        Maintenance::new(
            self.interview_service.clone(),
            self.bulk_service.clone(),
            self.screening_service.clone(),
            self.email_service.clone(),
        )
    }
}
