use crate::dto::application_dto::ApplicationListQuery;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStage, ApplicationSummary};
use crate::models::job::JobStatus;
use crate::services::ai_service::AIService;
use crate::services::audit_service::AuditService;
use crate::services::candidate_service::CandidateService;
use crate::services::job_service::JobService;
use crate::services::matching::MatchResult;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const APPLICATION_COLUMNS: &str =
    "id, candidate_id, job_id, stage, match_score, match_summary, match_details, created_at, updated_at";

const SUMMARY_SELECT: &str = r#"
    SELECT a.id, a.candidate_id, c.name AS candidate_name, c.email AS candidate_email,
           a.job_id, j.title AS job_title, a.stage, a.match_score, a.match_summary,
           a.created_at, a.updated_at
    FROM applications a
    JOIN candidates c ON c.id = a.candidate_id
    JOIN jobs j ON j.id = a.job_id
"#;

pub struct ApplicationList {
    pub items: Vec<ApplicationSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
    jobs: JobService,
    candidates: CandidateService,
    audit: AuditService,
}

impl ApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: JobService::new(pool.clone()),
            candidates: CandidateService::new(pool.clone()),
            audit: AuditService::new(pool.clone()),
            pool,
        }
    }

    /// Links a candidate to an active job; a second application for the same pair is a conflict.
    pub async fn apply(&self, candidate_id: Uuid, job_id: Uuid) -> Result<Application> {
        let job = self.jobs.get_by_id(job_id).await?;
        if job.status() != JobStatus::Active {
            return Err(Error::Conflict(format!(
                "Applications are only accepted for active jobs (job is {})",
                job.status
            )));
        }
        let candidate = self.candidates.get(candidate_id).await?;
        if candidate.is_archived() {
            return Err(Error::Conflict(
                "Archived candidates cannot apply; restore the candidate first".to_string(),
            ));
        }

        let query = format!(
            r#"
            INSERT INTO applications (candidate_id, job_id, stage)
            VALUES ($1, $2, 'applied')
            ON CONFLICT (candidate_id, job_id) DO NOTHING
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&query)
            .bind(candidate_id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                Error::Conflict("Candidate has already applied for this job".to_string())
            })?;

        tracing::info!(application_id = %application.id, %candidate_id, %job_id, "application created");
        Ok(application)
    }

    pub async fn get(&self, id: Uuid) -> Result<Application> {
        let query = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    pub async fn get_summary(&self, id: Uuid) -> Result<ApplicationSummary> {
        let query = format!("{} WHERE a.id = $1", SUMMARY_SELECT);
        sqlx::query_as::<_, ApplicationSummary>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    pub async fn find(&self, candidate_id: Uuid, job_id: Uuid) -> Result<Option<Application>> {
        let query = format!(
            "SELECT {} FROM applications WHERE candidate_id = $1 AND job_id = $2",
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&query)
            .bind(candidate_id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(application)
    }

    /// Best matches first; unscored applications sort last.
    pub async fn list(&self, query: ApplicationListQuery) -> Result<ApplicationList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
        let offset = (page - 1) * per_page;

        let stage = match query.stage.filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<ApplicationStage>().map_err(Error::BadRequest)?),
            None => None,
        };
        if let Some(min) = query.min_score {
            if !(0..=100).contains(&min) {
                return Err(Error::BadRequest("min_score must be between 0 and 100".to_string()));
            }
        }

        let filters = r#"
            WHERE ($1::uuid IS NULL OR a.job_id = $1)
              AND ($2::uuid IS NULL OR a.candidate_id = $2)
              AND ($3::text IS NULL OR a.stage = $3)
              AND ($4::int IS NULL OR a.match_score >= $4)
        "#;

        let items_query = format!(
            "{} {} ORDER BY a.match_score DESC NULLS LAST, a.created_at DESC LIMIT $5 OFFSET $6",
            SUMMARY_SELECT, filters
        );
        let items = sqlx::query_as::<_, ApplicationSummary>(&items_query)
            .bind(query.job_id)
            .bind(query.candidate_id)
            .bind(stage.map(|s| s.as_str()))
            .bind(query.min_score)
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total_query = format!("SELECT COUNT(*) FROM applications a {}", filters);
        let total = sqlx::query_scalar::<_, i64>(&total_query)
            .bind(query.job_id)
            .bind(query.candidate_id)
            .bind(stage.map(|s| s.as_str()))
            .bind(query.min_score)
            .fetch_one(&self.pool)
            .await?;

        Ok(ApplicationList {
            items,
            total,
            page,
            per_page,
            total_pages: ((total as f64) / (per_page as f64)).ceil() as i64,
        })
    }

    pub async fn for_candidate(&self, candidate_id: Uuid) -> Result<Vec<ApplicationSummary>> {
        self.candidates.get(candidate_id).await?;
        let query = format!("{} WHERE a.candidate_id = $1 ORDER BY a.created_at DESC", SUMMARY_SELECT);
        let items = sqlx::query_as::<_, ApplicationSummary>(&query)
            .bind(candidate_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn for_job(&self, job_id: Uuid) -> Result<Vec<ApplicationSummary>> {
        let query = format!(
            "{} WHERE a.job_id = $1 ORDER BY a.match_score DESC NULLS LAST, a.created_at DESC",
            SUMMARY_SELECT
        );
        let items = sqlx::query_as::<_, ApplicationSummary>(&query)
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn update_stage(
        &self,
        id: Uuid,
        to: ApplicationStage,
        actor: Option<Uuid>,
    ) -> Result<Application> {
        let application = self.get(id).await?;
        let from = application.stage();
        if from == to {
            return Ok(application);
        }
        if !from.can_move_to(to) {
            return Err(Error::Conflict(if from.is_terminal() {
                format!("Application is {} and can no longer change stage", from)
            } else {
                format!("Cannot move application from {} to {}", from, to)
            }));
        }

        let query = format!(
            "UPDATE applications SET stage = $2, updated_at = NOW() WHERE id = $1 AND stage = $3 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                Error::Conflict("Application stage changed concurrently; reload and retry".to_string())
            })?;

        if let Err(e) = self
            .audit
            .log(
                actor,
                "stage_changed",
                "application",
                id,
                Some(serde_json::json!({ "from": from.as_str(), "to": to.as_str() })),
            )
            .await
        {
            tracing::warn!(application_id = %id, error = ?e, "failed to write audit entry");
        }
        Ok(updated)
    }

    /// Moves an application to `interviewing` if it is still earlier in the funnel.
    pub async fn advance_to_interviewing(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE applications SET stage = 'interviewing', updated_at = NOW()
            WHERE id = $1 AND stage IN ('applied', 'screening', 'shortlisted')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_score(&self, id: Uuid, result: &MatchResult) -> Result<Application> {
        let query = format!(
            r#"
            UPDATE applications
            SET match_score = $2, match_summary = $3, match_details = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(result.score.clamp(0, 100))
            .bind(&result.summary)
            .bind(result.details())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        Ok(application)
    }

    /// Runs the matcher against the candidate's resume and stores the result.
    pub async fn rescore(&self, id: Uuid, ai: &AIService) -> Result<Application> {
        let application = self.get(id).await?;
        let candidate = self.candidates.get(application.candidate_id).await?;
        let job = self.jobs.get_by_id(application.job_id).await?;

        let profile = candidate.profile_text();
        if profile.trim().is_empty() {
            return Err(Error::BadRequest(
                "Candidate has no resume or profile to score".to_string(),
            ));
        }
        let result = ai.score_resume(&profile, &job).await?;
        tracing::info!(application_id = %id, score = result.score, method = ?result.method, "application scored");
        self.set_score(id, &result).await
    }

    pub async fn counts_by_stage(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT stage, COUNT(*) FROM applications GROUP BY stage ORDER BY stage",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn average_score(&self) -> Result<Option<f64>> {
        let avg = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(match_score)::float8 FROM applications WHERE match_score IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(avg)
    }
}
