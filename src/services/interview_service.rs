use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::interview_dto::{
    check_schedule, InterviewListQuery, RescheduleInterviewPayload, ScheduleInterviewPayload,
    DEFAULT_DURATION_MINUTES,
};
use crate::error::{Error, Result};
use crate::models::application::ApplicationStage;
use crate::models::interview::{Evaluation, Interview, InterviewKind, InterviewStatus};
use crate::services::ai_interview_client::{AiInterviewClient, CreateSessionRequest};
use crate::services::ai_service::parse_evaluation;
use crate::services::application_service::ApplicationService;
use crate::services::email_service::{templates, EmailService};
use crate::services::evaluation_service::{EvaluationService, EvaluationSource};

pub(crate) const INTERVIEW_COLUMNS: &str = "id, application_id, kind, scheduled_at, duration_minutes, status, interviewer, location, external_session_id, session_url, transcript, created_at, updated_at";

/// Who and what an interview is for.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InterviewContext {
    pub application_id: Uuid,
    pub stage: String,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_id: Uuid,
    pub job_title: String,
    pub job_description: String,
}

pub struct NewInterview {
    pub kind: InterviewKind,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub interviewer: Option<String>,
    pub location: Option<String>,
}

#[derive(Clone)]
pub struct InterviewService {
    pool: PgPool,
    applications: ApplicationService,
    email: EmailService,
    ai_interviews: AiInterviewClient,
}

impl InterviewService {
    pub fn new(pool: PgPool, email: EmailService, ai_interviews: AiInterviewClient) -> Self {
        Self {
            applications: ApplicationService::new(pool.clone()),
            pool,
            email,
            ai_interviews,
        }
    }

    pub async fn context(&self, application_id: Uuid) -> Result<InterviewContext> {
        sqlx::query_as::<_, InterviewContext>(
            r#"
            SELECT a.id AS application_id, a.stage, c.id AS candidate_id, c.name AS candidate_name,
                   c.email AS candidate_email, j.id AS job_id, j.title AS job_title,
                   j.description AS job_description
            FROM applications a
            JOIN candidates c ON c.id = a.candidate_id
            JOIN jobs j ON j.id = a.job_id
            WHERE a.id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    /// Fails unless the application can still take interviews.
    pub async fn open_context(&self, application_id: Uuid) -> Result<InterviewContext> {
        let ctx = self.context(application_id).await?;
        let stage: ApplicationStage = ctx.stage.parse().map_err(Error::Internal)?;
        if stage.is_terminal() {
            return Err(Error::Conflict(format!(
                "Application is {}; interviews can no longer be scheduled",
                stage
            )));
        }
        Ok(ctx)
    }

    pub async fn schedule(
        &self,
        application_id: Uuid,
        payload: ScheduleInterviewPayload,
    ) -> Result<Interview> {
        let duration = payload.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        check_schedule(payload.scheduled_at, duration, Utc::now()).map_err(Error::BadRequest)?;
        let kind: InterviewKind = payload.kind.parse().map_err(Error::BadRequest)?;
        let ctx = self.open_context(application_id).await?;

        let interview = self
            .create(
                &ctx,
                NewInterview {
                    kind,
                    scheduled_at: payload.scheduled_at,
                    duration_minutes: duration,
                    interviewer: payload.interviewer,
                    location: payload.location,
                },
            )
            .await?;

        if payload.notify_candidate {
            self.send_invitation(&ctx, &interview).await;
        }
        Ok(interview)
    }

    /// Inserts the interview and advances the application; no time checks.
    pub async fn create(&self, ctx: &InterviewContext, new: NewInterview) -> Result<Interview> {
        let query = format!(
            r#"
            INSERT INTO interviews (application_id, kind, scheduled_at, duration_minutes, status, interviewer, location)
            VALUES ($1, $2, $3, $4, 'scheduled', $5, $6)
            RETURNING {}
            "#,
            INTERVIEW_COLUMNS
        );
        let interview = sqlx::query_as::<_, Interview>(&query)
            .bind(ctx.application_id)
            .bind(new.kind.as_str())
            .bind(new.scheduled_at)
            .bind(new.duration_minutes)
            .bind(new.interviewer)
            .bind(new.location)
            .fetch_one(&self.pool)
            .await?;

        self.applications.advance_to_interviewing(ctx.application_id).await?;
        tracing::info!(interview_id = %interview.id, application_id = %ctx.application_id, kind = new.kind.as_str(), "interview scheduled");
        Ok(interview)
    }

    async fn send_invitation(&self, ctx: &InterviewContext, interview: &Interview) {
        let (subject, body) = templates::interview_invitation(
            &ctx.candidate_name,
            &ctx.job_title,
            interview.scheduled_at,
            interview.duration_minutes,
            &interview.kind,
            interview.location.as_deref(),
        );
        if let Err(e) = self.email.enqueue(&ctx.candidate_email, &subject, &body).await {
            tracing::error!(interview_id = %interview.id, error = ?e, "failed to queue interview invitation");
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Interview> {
        let query = format!("SELECT {} FROM interviews WHERE id = $1", INTERVIEW_COLUMNS);
        sqlx::query_as::<_, Interview>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Interview not found".to_string()))
    }

    pub async fn list(&self, query: InterviewListQuery) -> Result<Vec<Interview>> {
        let status = match query.status.filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<InterviewStatus>().map_err(Error::BadRequest)?),
            None => None,
        };
        let window_end = query
            .upcoming_days
            .filter(|d| *d > 0)
            .map(|d| Utc::now() + Duration::days(d.min(365)));
        let window_start = window_end.map(|_| Utc::now());
        let limit = query.limit.unwrap_or(100).clamp(1, 500);

        let sql = format!(
            r#"
            SELECT {} FROM interviews
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR application_id = $2)
              AND ($3::timestamptz IS NULL OR scheduled_at >= $3)
              AND ($4::timestamptz IS NULL OR scheduled_at <= $4)
            ORDER BY scheduled_at ASC
            LIMIT $5
            "#,
            INTERVIEW_COLUMNS
        );
        let items = sqlx::query_as::<_, Interview>(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(query.application_id)
            .bind(window_start)
            .bind(window_end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn reschedule(&self, id: Uuid, payload: RescheduleInterviewPayload) -> Result<Interview> {
        let interview = self.get(id).await?;
        if interview.status() != InterviewStatus::Scheduled {
            return Err(Error::Conflict(format!(
                "Only scheduled interviews can be rescheduled (status is {})",
                interview.status
            )));
        }
        let duration = payload.duration_minutes.unwrap_or(interview.duration_minutes);
        check_schedule(payload.scheduled_at, duration, Utc::now()).map_err(Error::BadRequest)?;

        let query = format!(
            r#"
            UPDATE interviews SET scheduled_at = $2, duration_minutes = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'scheduled'
            RETURNING {}
            "#,
            INTERVIEW_COLUMNS
        );
        let updated = sqlx::query_as::<_, Interview>(&query)
            .bind(id)
            .bind(payload.scheduled_at)
            .bind(duration)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Conflict("Interview changed concurrently; reload and retry".to_string()))?;

        if payload.notify_candidate {
            let ctx = self.context(updated.application_id).await?;
            self.send_invitation(&ctx, &updated).await;
        }
        Ok(updated)
    }

    async fn move_status(&self, interview: &Interview, to: InterviewStatus) -> Result<Interview> {
        let from = interview.status();
        if !from.can_transition_to(to) {
            return Err(Error::Conflict(format!(
                "Cannot move interview from {} to {}",
                from.as_str(),
                to.as_str()
            )));
        }
        let query = format!(
            "UPDATE interviews SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3 RETURNING {}",
            INTERVIEW_COLUMNS
        );
        sqlx::query_as::<_, Interview>(&query)
            .bind(interview.id)
            .bind(to.as_str())
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Conflict("Interview changed concurrently; reload and retry".to_string()))
    }

    pub async fn cancel(&self, id: Uuid, notify_candidate: bool, reason: Option<&str>) -> Result<Interview> {
        let interview = self.get(id).await?;
        let cancelled = self.move_status(&interview, InterviewStatus::Cancelled).await?;
        tracing::info!(interview_id = %id, reason = reason.unwrap_or(""), "interview cancelled");

        if notify_candidate {
            let ctx = self.context(cancelled.application_id).await?;
            let (subject, body) = templates::interview_cancelled(&ctx.candidate_name, &ctx.job_title);
            if let Err(e) = self.email.enqueue(&ctx.candidate_email, &subject, &body).await {
                tracing::error!(interview_id = %id, error = ?e, "failed to queue cancellation email");
            }
        }
        Ok(cancelled)
    }

    pub async fn complete(&self, id: Uuid, transcript: Option<String>) -> Result<Interview> {
        let interview = self.get(id).await?;
        let from = interview.status();
        if !from.can_transition_to(InterviewStatus::Completed) {
            return Err(Error::Conflict(format!(
                "Cannot complete an interview that is {}",
                from.as_str()
            )));
        }
        let transcript = transcript.filter(|t| !t.trim().is_empty());
        let query = format!(
            r#"
            UPDATE interviews SET status = 'completed', transcript = COALESCE($2, transcript), updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {}
            "#,
            INTERVIEW_COLUMNS
        );
        sqlx::query_as::<_, Interview>(&query)
            .bind(id)
            .bind(transcript)
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Conflict("Interview changed concurrently; reload and retry".to_string()))
    }

    pub fn ai_sessions_enabled(&self) -> bool {
        self.ai_interviews.is_enabled()
    }

    /// Opens a session with the AI interview service for a scheduled `ai` interview.
    pub async fn launch_ai_session(&self, id: Uuid) -> Result<Interview> {
        let interview = self.get(id).await?;
        if interview.kind() != InterviewKind::Ai {
            return Err(Error::BadRequest("Only AI interviews can launch a session".to_string()));
        }
        if interview.status() != InterviewStatus::Scheduled {
            return Err(Error::Conflict(format!(
                "AI session can only be launched for a scheduled interview (status is {})",
                interview.status
            )));
        }
        let ctx = self.context(interview.application_id).await?;

        let session = self
            .ai_interviews
            .create_session(&CreateSessionRequest {
                reference_id: interview.id.to_string(),
                candidate_name: ctx.candidate_name.clone(),
                candidate_email: ctx.candidate_email.clone(),
                job_title: ctx.job_title.clone(),
                job_description: ctx.job_description.clone(),
                duration_minutes: interview.duration_minutes,
            })
            .await?;

        let query = format!(
            r#"
            UPDATE interviews
            SET external_session_id = $2, session_url = $3, status = 'in_progress', updated_at = NOW()
            WHERE id = $1 AND status = 'scheduled'
            RETURNING {}
            "#,
            INTERVIEW_COLUMNS
        );
        let updated = sqlx::query_as::<_, Interview>(&query)
            .bind(id)
            .bind(&session.id)
            .bind(&session.session_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Conflict("Interview changed concurrently; reload and retry".to_string()))?;

        tracing::info!(interview_id = %id, session_id = %session.id, "AI interview session launched");
        Ok(updated)
    }

    /// Pulls the session state; a finished session completes the interview and stores its evaluation.
    pub async fn sync_ai_session(
        &self,
        id: Uuid,
        evaluations: &EvaluationService,
    ) -> Result<(Interview, Option<Evaluation>)> {
        let interview = self.get(id).await?;
        let session_id = interview
            .external_session_id
            .clone()
            .ok_or_else(|| Error::Conflict("Interview has no AI session".to_string()))?;

        let session = self.ai_interviews.get_session(&session_id).await?;
        if !session.is_completed() {
            let evaluation = evaluations.find(id).await?;
            return Ok((interview, evaluation));
        }

        let interview = match interview.status() {
            InterviewStatus::Completed => interview,
            _ => self.complete(id, session.transcript_text()).await?,
        };

        let evaluation = match session.evaluation.as_ref() {
            Some(raw) if !raw.is_null() => {
                let draft = parse_evaluation(raw);
                Some(evaluations.store(id, &draft, EvaluationSource::AiInterview).await?)
            }
            _ => evaluations.find(id).await?,
        };
        Ok((interview, evaluation))
    }

    /// Scheduled interviews that ended more than `grace_minutes` ago become no-shows.
    pub async fn mark_no_shows(&self, grace_minutes: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE interviews SET status = 'no_show', updated_at = NOW()
            WHERE status = 'scheduled'
              AND scheduled_at + make_interval(mins => duration_minutes) < NOW() - make_interval(mins => $1::int)
            "#,
        )
        .bind(grace_minutes as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn upcoming_count(&self, days: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM interviews
            WHERE status = 'scheduled' AND scheduled_at BETWEEN NOW() AND NOW() + make_interval(days => $1::int)
            "#,
        )
        .bind(days as i32)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
