use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;
use crate::services::application_service::ApplicationService;
use crate::services::candidate_service::CandidateService;
use crate::services::interview_service::InterviewService;
use crate::services::job_service::JobService;

const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub jobs_by_status: BTreeMap<String, i64>,
    pub active_candidates: i64,
    pub applications_by_stage: BTreeMap<String, i64>,
    pub total_applications: i64,
    pub upcoming_interviews: i64,
    pub average_match_score: Option<f64>,
}

#[derive(Clone)]
pub struct StatsService {
    jobs: JobService,
    candidates: CandidateService,
    applications: ApplicationService,
    interviews: InterviewService,
}

impl StatsService {
    pub fn new(pool: PgPool, interviews: InterviewService) -> Self {
        Self {
            jobs: JobService::new(pool.clone()),
            candidates: CandidateService::new(pool.clone()),
            applications: ApplicationService::new(pool),
            interviews,
        }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let (jobs, active_candidates, stages, upcoming_interviews, average_match_score) = tokio::try_join!(
            self.jobs.counts_by_status(),
            self.candidates.count_active(),
            self.applications.counts_by_stage(),
            self.interviews.upcoming_count(UPCOMING_WINDOW_DAYS),
            self.applications.average_score(),
        )?;

        let applications_by_stage: BTreeMap<String, i64> = stages.into_iter().collect();
        Ok(DashboardStats {
            jobs_by_status: jobs.into_iter().collect(),
            active_candidates,
            total_applications: applications_by_stage.values().sum(),
            applications_by_stage,
            upcoming_interviews,
            average_match_score: average_match_score.map(|s| (s * 10.0).round() / 10.0),
        })
    }
}
