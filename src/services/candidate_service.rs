use crate::dto::candidate_dto::{CandidateListQuery, NewCandidate, UpdateCandidatePayload};
use crate::error::{Error, Result};
use crate::models::candidate::{normalize_email, Candidate, CandidateSource, HistoryItem, InboundEmail};
use crate::services::audit_service::AuditService;
use crate::services::resume_extractor;
use crate::utils::files;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const CANDIDATE_COLUMNS: &str = "id, name, email, phone, location, current_title, experience_years, skills, resume_path, resume_text, source, notes, archived_at, created_at, updated_at";

pub struct CandidateList {
    pub items: Vec<Candidate>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
    audit: AuditService,
}

#[derive(sqlx::FromRow)]
struct ApplicationEvent {
    id: Uuid,
    job_title: String,
    stage: String,
    match_score: Option<i32>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct InterviewEvent {
    id: Uuid,
    job_title: String,
    kind: String,
    status: String,
    scheduled_at: DateTime<Utc>,
    overall_score: Option<i32>,
    recommendation: Option<String>,
    evaluated_at: Option<DateTime<Utc>>,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        let audit = AuditService::new(pool.clone());
        Self { pool, audit }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        let query = format!(
            "SELECT {} FROM candidates WHERE LOWER(email) = $1",
            CANDIDATE_COLUMNS
        );
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(candidate)
    }

    pub async fn create(&self, new: NewCandidate, source: CandidateSource) -> Result<Candidate> {
        let email = normalize_email(&new.email);
        if email.is_empty() {
            return Err(Error::BadRequest("Email is required".to_string()));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(Error::Conflict(
                "A candidate with this email address already exists.".to_string(),
            ));
        }

        let query = format!(
            r#"
            INSERT INTO candidates (
                name, email, phone, location, current_title, experience_years, skills,
                resume_path, resume_text, source, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            CANDIDATE_COLUMNS
        );
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(new.name.trim())
            .bind(&email)
            .bind(new.phone.filter(|p| !p.trim().is_empty()))
            .bind(new.location)
            .bind(new.current_title)
            .bind(new.experience_years)
            .bind(new.skills)
            .bind(new.resume_path)
            .bind(new.resume_text)
            .bind(source.as_str())
            .bind(new.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match Error::from(e) {
                Error::Conflict(_) => Error::Conflict(
                    "A candidate with this email address already exists.".to_string(),
                ),
                other => other,
            })?;

        tracing::info!(candidate_id = %candidate.id, source = source.as_str(), "candidate created");
        Ok(candidate)
    }

    pub async fn get(&self, id: Uuid) -> Result<Candidate> {
        let query = format!("SELECT {} FROM candidates WHERE id = $1", CANDIDATE_COLUMNS);
        sqlx::query_as::<_, Candidate>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))
    }

    pub async fn list(&self, query: CandidateListQuery) -> Result<CandidateList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if !query.include_archived {
            filters.push("archived_at IS NULL".to_string());
        }
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            let first = args.len() + 1;
            filters.push(format!(
                "(name ILIKE ${} OR email ILIKE ${} OR current_title ILIKE ${})",
                first,
                first + 1,
                first + 2
            ));
            for _ in 0..3 {
                args.push(format!("%{}%", search));
            }
        }
        if let Some(skill) = query.skill.filter(|s| !s.is_empty()) {
            filters.push(format!(
                "EXISTS (SELECT 1 FROM unnest(skills) s WHERE LOWER(s) = LOWER(${}))",
                args.len() + 1
            ));
            args.push(skill);
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT {} FROM candidates {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            CANDIDATE_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM candidates {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Candidate>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        let items = items_statement
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        Ok(CandidateList {
            items,
            total,
            page,
            per_page,
            total_pages: ((total as f64) / (per_page as f64)).ceil() as i64,
        })
    }

    pub async fn update(&self, id: Uuid, payload: UpdateCandidatePayload) -> Result<Candidate> {
        let current = self.get(id).await?;
        if current.is_archived() {
            return Err(Error::Conflict("Archived candidates cannot be edited".to_string()));
        }

        let email = payload.email.as_deref().map(normalize_email);
        if let Some(ref new_email) = email {
            if let Some(other) = self.find_by_email(new_email).await? {
                if other.id != id {
                    return Err(Error::Conflict(
                        "A candidate with this email address already exists.".to_string(),
                    ));
                }
            }
        }

        let query = format!(
            r#"
            UPDATE candidates
            SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                location = COALESCE($5, location),
                current_title = COALESCE($6, current_title),
                experience_years = COALESCE($7, experience_years),
                skills = COALESCE($8, skills),
                notes = COALESCE($9, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CANDIDATE_COLUMNS
        );
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(id)
            .bind(payload.name)
            .bind(email)
            .bind(payload.phone)
            .bind(payload.location)
            .bind(payload.current_title)
            .bind(payload.experience_years)
            .bind(payload.skills)
            .bind(payload.notes)
            .fetch_one(&self.pool)
            .await?;
        Ok(candidate)
    }

    pub async fn archive(&self, id: Uuid, actor: Option<Uuid>) -> Result<Candidate> {
        let query = format!(
            "UPDATE candidates SET archived_at = COALESCE(archived_at, NOW()), updated_at = NOW() WHERE id = $1 RETURNING {}",
            CANDIDATE_COLUMNS
        );
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))?;

        if let Err(e) = self.audit.log(actor, "archived", "candidate", id, None).await {
            tracing::warn!(candidate_id = %id, error = ?e, "failed to write audit entry");
        }
        Ok(candidate)
    }

    pub async fn restore(&self, id: Uuid, actor: Option<Uuid>) -> Result<Candidate> {
        let query = format!(
            "UPDATE candidates SET archived_at = NULL, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CANDIDATE_COLUMNS
        );
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))?;

        if let Err(e) = self.audit.log(actor, "restored", "candidate", id, None).await {
            tracing::warn!(candidate_id = %id, error = ?e, "failed to write audit entry");
        }
        Ok(candidate)
    }

    pub async fn set_resume(&self, id: Uuid, resume_path: &str, resume_text: &str) -> Result<Candidate> {
        let query = format!(
            "UPDATE candidates SET resume_path = $2, resume_text = $3, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CANDIDATE_COLUMNS
        );
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(id)
            .bind(resume_path)
            .bind(resume_text)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))?;
        Ok(candidate)
    }

    /// Extracts and stores an uploaded resume, replacing the previous one.
    pub async fn attach_resume(&self, id: Uuid, data: bytes::Bytes) -> Result<Candidate> {
        let candidate = self.get(id).await?;
        if candidate.archived_at.is_some() {
            return Err(Error::Conflict("Archived candidates cannot be modified".to_string()));
        }
        let extracted = resume_extractor::extract_text(data.clone()).await?;
        let path = files::store_upload("resumes", extracted.format.extension(), &data).await?;
        let updated = self.set_resume(id, &path, &extracted.text).await?;
        tracing::info!(candidate_id = %id, format = ?extracted.format, chars = extracted.text.len(), "resume attached");
        Ok(updated)
    }

    pub async fn record_inbound_email(
        &self,
        candidate_id: Option<Uuid>,
        from_address: &str,
        subject: Option<&str>,
        body: Option<&str>,
        attachment_names: &[String],
    ) -> Result<InboundEmail> {
        let row = sqlx::query_as::<_, InboundEmail>(
            r#"
            INSERT INTO inbound_emails (candidate_id, from_address, subject, body, attachment_names)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, candidate_id, from_address, subject, body, attachment_names, received_at
            "#,
        )
        .bind(candidate_id)
        .bind(normalize_email(from_address))
        .bind(subject)
        .bind(body)
        .bind(attachment_names)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn messages(&self, id: Uuid) -> Result<Vec<InboundEmail>> {
        self.get(id).await?;
        let rows = sqlx::query_as::<_, InboundEmail>(
            r#"
            SELECT id, candidate_id, from_address, subject, body, attachment_names, received_at
            FROM inbound_emails
            WHERE candidate_id = $1
            ORDER BY received_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Timeline of applications, interviews and evaluations, newest first.
    pub async fn history(&self, id: Uuid) -> Result<Vec<HistoryItem>> {
        let candidate = self.get(id).await?;
        let mut history = vec![HistoryItem {
            event_type: "created".to_string(),
            title: "Candidate added".to_string(),
            description: Some(format!("Source: {}", candidate.source)),
            timestamp: candidate.created_at,
            status: None,
            metadata: None,
        }];

        let applications = sqlx::query_as::<_, ApplicationEvent>(
            r#"
            SELECT a.id, j.title AS job_title, a.stage, a.match_score, a.created_at
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.candidate_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        for app in applications {
            history.push(HistoryItem {
                event_type: "application".to_string(),
                title: format!("Applied for {}", app.job_title),
                description: app.match_score.map(|s| format!("Match score: {}", s)),
                timestamp: app.created_at,
                status: Some(app.stage),
                metadata: Some(serde_json::json!({ "application_id": app.id })),
            });
        }

        let interviews = sqlx::query_as::<_, InterviewEvent>(
            r#"
            SELECT i.id, j.title AS job_title, i.kind, i.status, i.scheduled_at,
                   e.overall_score, e.recommendation, e.created_at AS evaluated_at
            FROM interviews i
            JOIN applications a ON a.id = i.application_id
            JOIN jobs j ON j.id = a.job_id
            LEFT JOIN evaluations e ON e.interview_id = i.id
            WHERE a.candidate_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        for interview in interviews {
            history.push(HistoryItem {
                event_type: "interview".to_string(),
                title: format!("{} interview for {}", interview.kind, interview.job_title),
                description: None,
                timestamp: interview.scheduled_at,
                status: Some(interview.status),
                metadata: Some(serde_json::json!({ "interview_id": interview.id })),
            });
            if let (Some(score), Some(at)) = (interview.overall_score, interview.evaluated_at) {
                history.push(HistoryItem {
                    event_type: "evaluation".to_string(),
                    title: "Interview evaluated".to_string(),
                    description: Some(format!("Score: {}", score)),
                    timestamp: at,
                    status: interview.recommendation,
                    metadata: Some(serde_json::json!({ "interview_id": interview.id })),
                });
            }
        }

        if let Some(archived_at) = candidate.archived_at {
            history.push(HistoryItem {
                event_type: "archived".to_string(),
                title: "Candidate archived".to_string(),
                description: None,
                timestamp: archived_at,
                status: None,
                metadata: None,
            });
        }

        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM candidates WHERE archived_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
