use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::interview::{Evaluation, Interview, InterviewStatus};
use crate::services::ai_service::{AIService, EvaluationDraft};
use crate::services::job_service::JobService;

const EVALUATION_COLUMNS: &str = "id, interview_id, overall_score, recommendation, strengths, concerns, summary, criteria, source, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationSource {
    AiInterview,
    Llm,
}

impl EvaluationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationSource::AiInterview => "ai_interview",
            EvaluationSource::Llm => "llm",
        }
    }
}

#[derive(Clone)]
pub struct EvaluationService {
    pool: PgPool,
    jobs: JobService,
}

impl EvaluationService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: JobService::new(pool.clone()),
            pool,
        }
    }

    /// Asks the LLM to evaluate a completed interview's transcript and stores the result.
    pub async fn evaluate(&self, interview: &Interview, ai: &AIService) -> Result<Evaluation> {
        if interview.status() != InterviewStatus::Completed {
            return Err(Error::Conflict(
                "Only completed interviews can be evaluated".to_string(),
            ));
        }
        let transcript = interview
            .transcript
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::BadRequest("Interview has no transcript to evaluate".to_string())
            })?;

        let (job_id, candidate_name) = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT a.job_id, c.name
            FROM applications a JOIN candidates c ON c.id = a.candidate_id
            WHERE a.id = $1
            "#,
        )
        .bind(interview.application_id)
        .fetch_one(&self.pool)
        .await?;
        let job = self.jobs.get_by_id(job_id).await?;

        let draft = ai.evaluate_transcript(transcript, &job, &candidate_name).await?;
        let evaluation = self.store(interview.id, &draft, EvaluationSource::Llm).await?;
        tracing::info!(interview_id = %interview.id, score = evaluation.overall_score, "interview evaluated");
        Ok(evaluation)
    }

    /// Inserts or replaces the evaluation of an interview.
    pub async fn store(
        &self,
        interview_id: Uuid,
        draft: &EvaluationDraft,
        source: EvaluationSource,
    ) -> Result<Evaluation> {
        let query = format!(
            r#"
            INSERT INTO evaluations (interview_id, overall_score, recommendation, strengths, concerns, summary, criteria, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (interview_id) DO UPDATE SET
                overall_score = EXCLUDED.overall_score,
                recommendation = EXCLUDED.recommendation,
                strengths = EXCLUDED.strengths,
                concerns = EXCLUDED.concerns,
                summary = EXCLUDED.summary,
                criteria = EXCLUDED.criteria,
                source = EXCLUDED.source,
                created_at = NOW()
            RETURNING {}
            "#,
            EVALUATION_COLUMNS
        );
        let evaluation = sqlx::query_as::<_, Evaluation>(&query)
            .bind(interview_id)
            .bind(draft.overall_score.clamp(0, 100))
            .bind(draft.recommendation.as_str())
            .bind(&draft.strengths)
            .bind(&draft.concerns)
            .bind(&draft.summary)
            .bind(&draft.criteria)
            .bind(source.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(evaluation)
    }

    pub async fn find(&self, interview_id: Uuid) -> Result<Option<Evaluation>> {
        let query = format!("SELECT {} FROM evaluations WHERE interview_id = $1", EVALUATION_COLUMNS);
        let evaluation = sqlx::query_as::<_, Evaluation>(&query)
            .bind(interview_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(evaluation)
    }

    pub async fn get(&self, interview_id: Uuid) -> Result<Evaluation> {
        self.find(interview_id)
            .await?
            .ok_or_else(|| Error::NotFound("Interview has not been evaluated yet".to_string()))
    }

    pub async fn list_for_application(&self, application_id: Uuid) -> Result<Vec<Evaluation>> {
        let query = r#"
            SELECT e.id, e.interview_id, e.overall_score, e.recommendation, e.strengths, e.concerns,
                   e.summary, e.criteria, e.source, e.created_at
            FROM evaluations e
            JOIN interviews i ON i.id = e.interview_id
            WHERE i.application_id = $1
            ORDER BY i.scheduled_at DESC
        "#;
        let items = sqlx::query_as::<_, Evaluation>(query)
            .bind(application_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}
