use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::SmtpSettings;
use crate::dto::candidate_dto::NewCandidate;
use crate::dto::webhook_dto::{parse_address, InboundEmailPayload, InboundEmailResponse};
use crate::error::{Error, Result};
use crate::models::candidate::CandidateSource;
use crate::models::email::OutboxEmail;
use crate::services::candidate_service::CandidateService;
use crate::services::resume_extractor;
use crate::utils::files;

const OUTBOX_COLUMNS: &str = "id, to_address, subject, body, status, attempts, max_attempts, next_retry_at, last_error, claimed_at, created_at, sent_at";
const MAX_BACKOFF_SECS: i64 = 3600;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, from: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| Error::Config(format!("Invalid SMTP host: {}", e)))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| Error::Config(format!("Invalid EMAIL_FROM address: {}", e)))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| Error::Mail(format!("Invalid recipient '{}': {}", to, e)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Mail(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;
        Ok(())
    }
}

/// Used when SMTP is not configured: messages are logged and marked sent.
pub struct LogMailer;

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::info!(to = %to, subject = %subject, "SMTP not configured; email logged only");
        Ok(())
    }
}

/// Delay before retry number `attempts + 1`: 30s doubling per attempt, capped at one hour.
pub fn backoff_secs(attempts: i32) -> i64 {
    let exponent = (attempts.max(1) - 1).min(16) as u32;
    (30_i64 * 2_i64.pow(exponent)).min(MAX_BACKOFF_SECS)
}

pub mod templates {
    use chrono::{DateTime, Utc};

    pub fn interview_invitation(
        candidate_name: &str,
        job_title: &str,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i32,
        kind: &str,
        location: Option<&str>,
    ) -> (String, String) {
        let subject = format!("Interview invitation: {}", job_title);
        let mut body = format!(
            "Hello {},\n\nYou are invited to a {} interview for the {} position.\n\nWhen: {} (UTC)\nDuration: {} minutes\n",
            candidate_name,
            kind,
            job_title,
            scheduled_at.format("%A, %d %B %Y at %H:%M"),
            duration_minutes
        );
        if let Some(location) = location.filter(|l| !l.trim().is_empty()) {
            body.push_str(&format!("Where: {}\n", location));
        }
        body.push_str("\nPlease reply to this email if you need to reschedule.\n\nBest regards,\nThe Hiring Team");
        (subject, body)
    }

    pub fn interview_cancelled(candidate_name: &str, job_title: &str) -> (String, String) {
        (
            format!("Interview cancelled: {}", job_title),
            format!(
                "Hello {},\n\nYour interview for the {} position has been cancelled. We will be in touch.\n\nBest regards,\nThe Hiring Team",
                candidate_name, job_title
            ),
        )
    }

    pub fn screening_link(
        candidate_name: &str,
        job_title: &str,
        link: &str,
        ai_screening: bool,
        expires_at: DateTime<Utc>,
    ) -> (String, String) {
        let (subject, action) = if ai_screening {
            (
                format!("Start your AI screening interview: {}", job_title),
                "start your AI screening interview",
            )
        } else {
            (
                format!("Schedule your interview: {}", job_title),
                "pick a time for your interview",
            )
        };
        let body = format!(
            "Hello {},\n\nThank you for applying for the {} position. Use the link below to {}:\n\n{}\n\nThe link can be used once and expires on {} (UTC).\n\nBest regards,\nThe Hiring Team",
            candidate_name,
            job_title,
            action,
            link,
            expires_at.format("%d %B %Y at %H:%M")
        );
        (subject, body)
    }
}

/// Sends one outbox row through the transport.
pub async fn deliver(transport: &dyn MailTransport, email: &OutboxEmail) -> Result<()> {
    transport.send(&email.to_address, &email.subject, &email.body).await
}

#[derive(Clone)]
pub struct EmailService {
    pool: PgPool,
    transport: Arc<dyn MailTransport>,
    candidates: CandidateService,
}

impl EmailService {
    pub fn new(pool: PgPool, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            candidates: CandidateService::new(pool.clone()),
            pool,
            transport,
        }
    }

    /// SMTP when configured, otherwise the logging transport.
    pub fn transport_from_config() -> Arc<dyn MailTransport> {
        let config = crate::config::get_config();
        match &config.smtp {
            Some(settings) => match SmtpMailer::new(settings, &config.email_from) {
                Ok(mailer) => Arc::new(mailer),
                Err(e) => {
                    tracing::error!(error = %e, "SMTP configuration invalid; falling back to log mailer");
                    Arc::new(LogMailer)
                }
            },
            None => Arc::new(LogMailer),
        }
    }

    pub async fn enqueue(&self, to: &str, subject: &str, body: &str) -> Result<OutboxEmail> {
        let query = format!(
            "INSERT INTO email_outbox (to_address, subject, body, status) VALUES ($1, $2, $3, 'pending') RETURNING {}",
            OUTBOX_COLUMNS
        );
        let row = sqlx::query_as::<_, OutboxEmail>(&query)
            .bind(to)
            .bind(subject)
            .bind(body)
            .fetch_one(&self.pool)
            .await?;
        tracing::debug!(email_id = %row.id, "email queued");
        Ok(row)
    }

    /// Claims one due message and tries to send it. Returns `false` when the outbox is idle.
    pub async fn run_once(&self) -> Result<bool> {
        let query = format!(
            r#"
            UPDATE email_outbox SET status = 'sending', attempts = attempts + 1, claimed_at = NOW()
            WHERE id = (
                SELECT id FROM email_outbox
                WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {}
            "#,
            OUTBOX_COLUMNS
        );
        let claimed = sqlx::query_as::<_, OutboxEmail>(&query)
            .fetch_optional(&self.pool)
            .await?;
        let Some(email) = claimed else { return Ok(false) };

        match deliver(self.transport.as_ref(), &email).await {
            Ok(()) => {
                sqlx::query(
                    "UPDATE email_outbox SET status = 'sent', sent_at = NOW(), last_error = NULL, claimed_at = NULL WHERE id = $1",
                )
                .bind(email.id)
                .execute(&self.pool)
                .await?;
                tracing::info!(email_id = %email.id, "email sent");
            }
            Err(e) => {
                let retry = email.attempts < email.max_attempts;
                let next_retry_at: Option<DateTime<Utc>> =
                    retry.then(|| Utc::now() + chrono::Duration::seconds(backoff_secs(email.attempts)));
                sqlx::query(
                    "UPDATE email_outbox SET status = $2, last_error = $3, next_retry_at = $4, claimed_at = NULL WHERE id = $1",
                )
                .bind(email.id)
                .bind(if retry { "pending" } else { "failed" })
                .bind(e.to_string())
                .bind(next_retry_at)
                .execute(&self.pool)
                .await?;
                tracing::warn!(email_id = %email.id, attempts = email.attempts, retry, error = %e, "email delivery failed");
            }
        }
        Ok(true)
    }

    /// Stores an inbound message and links or creates the sender's candidate record.
    pub async fn receive(&self, payload: InboundEmailPayload) -> Result<InboundEmailResponse> {
        let (display_name, address) = parse_address(&payload.from);
        if !address.contains('@') {
            return Err(Error::BadRequest("Sender address is invalid".to_string()));
        }
        let attachment_names: Vec<String> = payload
            .attachments
            .iter()
            .map(|a| files::sanitize_file_name(&a.filename))
            .collect();

        let mut candidate = self.candidates.find_by_email(&address).await?;
        let mut candidate_created = false;
        let mut resume_updated = false;
        let mut resume_error = None;

        if let Some(attachment) = payload.attachments.iter().find(|a| a.looks_like_resume()) {
            match self.read_resume(&attachment.content).await {
                Ok((path, text)) => match &candidate {
                    Some(existing) => {
                        candidate = Some(self.candidates.set_resume(existing.id, &path, &text).await?);
                        resume_updated = true;
                    }
                    None => {
                        let contacts = resume_extractor::extract_contacts(&text);
                        let name = display_name
                            .clone()
                            .or(contacts.name)
                            .unwrap_or_else(|| address.split('@').next().unwrap_or("Candidate").to_string());
                        let new = NewCandidate {
                            name,
                            email: address.clone(),
                            phone: contacts.phone,
                            resume_path: Some(path),
                            resume_text: Some(text),
                            ..Default::default()
                        };
                        candidate = Some(self.candidates.create(new, CandidateSource::Email).await?);
                        candidate_created = true;
                        resume_updated = true;
                    }
                },
                Err(e) => {
                    tracing::warn!(from = %address, file = %attachment.filename, error = %e, "could not read emailed resume");
                    resume_error = Some(e.to_string());
                }
            }
        }

        let candidate_id = candidate.as_ref().map(|c| c.id);
        let inbound = self
            .candidates
            .record_inbound_email(
                candidate_id,
                &address,
                payload.subject.as_deref(),
                payload.text.as_deref(),
                &attachment_names,
            )
            .await?;

        tracing::info!(inbound_email_id = %inbound.id, candidate_id = ?candidate_id, candidate_created, "inbound email stored");
        Ok(InboundEmailResponse {
            inbound_email_id: inbound.id,
            candidate_id,
            candidate_created,
            resume_updated,
            resume_error,
        })
    }

    async fn read_resume(&self, content_base64: &str) -> Result<(String, String)> {
        let cleaned: String = content_base64.chars().filter(|c| !c.is_whitespace()).collect();
        let data = BASE64
            .decode(cleaned.as_bytes())
            .map_err(|e| Error::BadRequest(format!("Attachment is not valid base64: {}", e)))?;
        let data = Bytes::from(data);
        let extracted = resume_extractor::extract_text(data.clone()).await?;
        let path = files::store_upload("resumes", extracted.format.extension(), &data).await?;
        Ok((path, extracted.text))
    }

    /// Hands messages whose worker vanished mid-delivery back to the queue.
    /// A claim that already used the last attempt is marked failed instead.
    pub async fn release_stale(&self, older_than_minutes: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE email_outbox
            SET status = CASE WHEN attempts < max_attempts THEN 'pending' ELSE 'failed' END,
                last_error = 'Delivery was interrupted',
                next_retry_at = NULL,
                claimed_at = NULL
            WHERE status = 'sending' AND claimed_at < NOW() - make_interval(mins => $1::int)
            "#,
        )
        .bind(older_than_minutes as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn pending_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM email_outbox WHERE status IN ('pending', 'sending')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn get(&self, id: Uuid) -> Result<OutboxEmail> {
        let query = format!("SELECT {} FROM email_outbox WHERE id = $1", OUTBOX_COLUMNS);
        sqlx::query_as::<_, OutboxEmail>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Email not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn outbox(to: &str) -> OutboxEmail {
        OutboxEmail {
            id: Uuid::new_v4(),
            to_address: to.to_string(),
            subject: "Hello".into(),
            body: "Body".into(),
            status: "sending".into(),
            attempts: 1,
            max_attempts: 3,
            next_retry_at: None,
            last_error: None,
            claimed_at: Some(Utc::now()),
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_secs(1), 30);
        assert_eq!(backoff_secs(2), 60);
        assert_eq!(backoff_secs(3), 120);
        assert_eq!(backoff_secs(0), 30);
        assert_eq!(backoff_secs(12), MAX_BACKOFF_SECS);
        assert_eq!(backoff_secs(100), MAX_BACKOFF_SECS);
    }

    #[tokio::test]
    async fn delivers_through_transport() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|to, subject, body| to == "jane@example.com" && subject == "Hello" && body == "Body")
            .times(1)
            .returning(|_, _, _| Ok(()));
        tokio_test::assert_ok!(deliver(&transport, &outbox("jane@example.com")).await);
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .returning(|_, _, _| Err(Error::Mail("connection refused".into())));
        let err = deliver(&transport, &outbox("jane@example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Mail(_)));
    }

    #[test]
    fn invitation_mentions_time_and_location() {
        let at = Utc.with_ymd_and_hms(2026, 11, 2, 14, 30, 0).unwrap();
        let (subject, body) =
            templates::interview_invitation("Jane", "Data Engineer", at, 45, "video", Some("https://meet.example.com/x"));
        assert_eq!(subject, "Interview invitation: Data Engineer");
        assert!(body.contains("Monday, 02 November 2026 at 14:30"));
        assert!(body.contains("45 minutes"));
        assert!(body.contains("https://meet.example.com/x"));
    }

    #[test]
    fn screening_link_varies_by_purpose() {
        let at = Utc.with_ymd_and_hms(2026, 11, 5, 9, 0, 0).unwrap();
        let (subject, body) = templates::screening_link("Jane", "QA", "https://app/s/abc", true, at);
        assert!(subject.starts_with("Start your AI screening"));
        assert!(body.contains("https://app/s/abc"));
        let (subject, _) = templates::screening_link("Jane", "QA", "https://app/s/abc", false, at);
        assert!(subject.starts_with("Schedule your interview"));
    }
}
