use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::interview_dto::{check_schedule, DEFAULT_DURATION_MINUTES};
use crate::dto::screening_dto::{PublicInterviewResponse, PublicSchedulePayload, ScreeningInfo};
use crate::error::{Error, Result};
use crate::models::interview::InterviewKind;
use crate::models::screening_token::{ScreeningPurpose, ScreeningToken};
use crate::services::email_service::{templates, EmailService};
use crate::services::interview_service::{InterviewService, NewInterview};
use crate::utils::token::{generate_screening_token, looks_like_screening_token};

const TOKEN_COLUMNS: &str = "id, token, application_id, purpose, expires_at, used_at, created_at";
const MAX_TTL_HOURS: i64 = 720;

#[derive(Clone)]
pub struct ScreeningService {
    pool: PgPool,
    interviews: InterviewService,
    email: EmailService,
}

pub fn screening_link(webapp_url: &str, token: &str) -> String {
    format!("{}/screening/{}", webapp_url.trim_end_matches('/'), token)
}

impl ScreeningService {
    pub fn new(pool: PgPool, interviews: InterviewService, email: EmailService) -> Self {
        Self {
            pool,
            interviews,
            email,
        }
    }

    pub async fn issue(
        &self,
        application_id: Uuid,
        purpose: ScreeningPurpose,
        ttl_hours: Option<i64>,
        send_email: bool,
    ) -> Result<(ScreeningToken, String)> {
        let config = get_config();
        let ttl = ttl_hours
            .unwrap_or(config.screening_token_ttl_hours)
            .clamp(1, MAX_TTL_HOURS);
        let ctx = self.interviews.open_context(application_id).await?;

        let query = format!(
            r#"
            INSERT INTO screening_tokens (token, application_id, purpose, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        );
        let token = sqlx::query_as::<_, ScreeningToken>(&query)
            .bind(generate_screening_token())
            .bind(application_id)
            .bind(purpose.as_str())
            .bind(Utc::now() + Duration::hours(ttl))
            .fetch_one(&self.pool)
            .await?;
        let link = screening_link(&config.webapp_url, &token.token);

        if send_email {
            let (subject, body) = templates::screening_link(
                &ctx.candidate_name,
                &ctx.job_title,
                &link,
                purpose == ScreeningPurpose::AiScreening,
                token.expires_at,
            );
            self.email.enqueue(&ctx.candidate_email, &subject, &body).await?;
        }

        tracing::info!(application_id = %application_id, purpose = purpose.as_str(), ttl_hours = ttl, "screening link issued");
        Ok((token, link))
    }

    async fn find_usable(&self, raw: &str) -> Result<ScreeningToken> {
        if !looks_like_screening_token(raw) {
            return Err(Error::NotFound("Screening link not found".to_string()));
        }
        let query = format!("SELECT {} FROM screening_tokens WHERE token = $1", TOKEN_COLUMNS);
        let token = sqlx::query_as::<_, ScreeningToken>(&query)
            .bind(raw)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Screening link not found".to_string()))?;

        if token.used_at.is_some() {
            return Err(Error::Conflict("This screening link has already been used".to_string()));
        }
        if !token.is_usable_at(Utc::now()) {
            return Err(Error::Conflict("This screening link has expired".to_string()));
        }
        Ok(token)
    }

    /// Marks the token used; only one caller can win.
    async fn consume(&self, token: &ScreeningToken) -> Result<()> {
        let result = sqlx::query(
            "UPDATE screening_tokens SET used_at = NOW() WHERE id = $1 AND used_at IS NULL AND expires_at > NOW()",
        )
        .bind(token.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::Conflict("This screening link has already been used".to_string()));
        }
        Ok(())
    }

    async fn release(&self, token: &ScreeningToken) {
        if let Err(e) = sqlx::query("UPDATE screening_tokens SET used_at = NULL WHERE id = $1")
            .bind(token.id)
            .execute(&self.pool)
            .await
        {
            tracing::error!(token_id = %token.id, error = ?e, "failed to release screening token");
        }
    }

    fn require_purpose(token: &ScreeningToken, expected: ScreeningPurpose) -> Result<()> {
        if token.purpose() != Some(expected) {
            return Err(Error::BadRequest(format!(
                "This link is for {}, not {}",
                token.purpose,
                expected.as_str()
            )));
        }
        Ok(())
    }

    pub async fn resolve(&self, raw: &str) -> Result<ScreeningInfo> {
        let token = self.find_usable(raw).await?;
        let ctx = self.interviews.context(token.application_id).await?;
        Ok(ScreeningInfo {
            candidate_name: ctx.candidate_name,
            job_title: ctx.job_title,
            purpose: token.purpose,
            expires_at: token.expires_at,
        })
    }

    /// Candidate self-scheduling through a `schedule` link.
    pub async fn schedule(&self, raw: &str, payload: PublicSchedulePayload) -> Result<PublicInterviewResponse> {
        let token = self.find_usable(raw).await?;
        Self::require_purpose(&token, ScreeningPurpose::Schedule)?;

        let kind = match payload.kind.as_deref() {
            Some(k) => k.parse::<InterviewKind>().map_err(Error::BadRequest)?,
            None => InterviewKind::Video,
        };
        if kind == InterviewKind::Ai {
            return Err(Error::BadRequest("AI interviews are started, not scheduled".to_string()));
        }
        let duration = payload.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        check_schedule(payload.scheduled_at, duration, Utc::now()).map_err(Error::BadRequest)?;
        let ctx = self.interviews.open_context(token.application_id).await?;

        self.consume(&token).await?;
        let interview = match self
            .interviews
            .create(
                &ctx,
                NewInterview {
                    kind,
                    scheduled_at: payload.scheduled_at,
                    duration_minutes: duration,
                    interviewer: None,
                    location: None,
                },
            )
            .await
        {
            Ok(interview) => interview,
            Err(e) => {
                self.release(&token).await;
                return Err(e);
            }
        };

        Ok(PublicInterviewResponse {
            interview_id: interview.id,
            scheduled_at: interview.scheduled_at,
            duration_minutes: interview.duration_minutes,
            kind: interview.kind,
            session_url: None,
        })
    }

    /// Starts an AI screening right away through an `ai_screening` link.
    pub async fn start(&self, raw: &str) -> Result<PublicInterviewResponse> {
        let token = self.find_usable(raw).await?;
        Self::require_purpose(&token, ScreeningPurpose::AiScreening)?;
        if !self.interviews.ai_sessions_enabled() {
            return Err(Error::Upstream(
                "AI interviews are not available at the moment; please try again later".to_string(),
            ));
        }
        let ctx = self.interviews.open_context(token.application_id).await?;

        self.consume(&token).await?;
        let interview = match self
            .interviews
            .create(
                &ctx,
                NewInterview {
                    kind: InterviewKind::Ai,
                    scheduled_at: Utc::now(),
                    duration_minutes: DEFAULT_DURATION_MINUTES,
                    interviewer: None,
                    location: None,
                },
            )
            .await
        {
            Ok(interview) => interview,
            Err(e) => {
                self.release(&token).await;
                return Err(e);
            }
        };

        let launched = match self.interviews.launch_ai_session(interview.id).await {
            Ok(launched) => launched,
            Err(e) => {
                tracing::error!(interview_id = %interview.id, error = ?e, "AI session launch failed");
                if let Err(cancel_err) = self.interviews.cancel(interview.id, false, Some("launch failed")).await {
                    tracing::error!(interview_id = %interview.id, error = ?cancel_err, "failed to cancel interview");
                }
                self.release(&token).await;
                return Err(e);
            }
        };

        Ok(PublicInterviewResponse {
            interview_id: launched.id,
            scheduled_at: launched.scheduled_at,
            duration_minutes: launched.duration_minutes,
            kind: launched.kind,
            session_url: launched.session_url,
        })
    }

    pub async fn for_application(&self, application_id: Uuid) -> Result<Vec<ScreeningToken>> {
        let query = format!(
            "SELECT {} FROM screening_tokens WHERE application_id = $1 ORDER BY created_at DESC",
            TOKEN_COLUMNS
        );
        let items = sqlx::query_as::<_, ScreeningToken>(&query)
            .bind(application_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Drops tokens that expired more than `keep_days` ago and were never used.
    pub async fn purge_expired(&self, keep_days: i64) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM screening_tokens WHERE used_at IS NULL AND expires_at < NOW() - make_interval(days => $1::int)",
        )
        .bind(keep_days as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_joins_without_double_slash() {
        assert_eq!(screening_link("https://app.example.com/", "abc"), "https://app.example.com/screening/abc");
        assert_eq!(screening_link("https://app.example.com", "abc"), "https://app.example.com/screening/abc");
    }

    #[test]
    fn purpose_mismatch_is_rejected() {
        let now = Utc::now();
        let token = ScreeningToken {
            id: Uuid::new_v4(),
            token: "x".repeat(40),
            application_id: Uuid::new_v4(),
            purpose: "schedule".into(),
            expires_at: now + Duration::hours(1),
            used_at: None,
            created_at: now,
        };
        assert!(ScreeningService::require_purpose(&token, ScreeningPurpose::Schedule).is_ok());
        assert!(matches!(
            ScreeningService::require_purpose(&token, ScreeningPurpose::AiScreening),
            Err(Error::BadRequest(_))
        ));
    }
}
