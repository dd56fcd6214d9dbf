use crate::dto::job_dto::{CreateJobPayload, JobListQuery, UpdateJobPayload};
use crate::error::{Error, Result};
use crate::models::audit_log::AuditLog;
use crate::models::job::{Job, JobStatus};
use crate::services::audit_service::AuditService;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const JOB_COLUMNS: &str = "id, title, department, location, employment_type, description, requirements, skills, min_experience_years, salary_min, salary_max, openings, status, created_by, published_at, closed_at, created_at, updated_at";

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
    audit: AuditService,
}

pub struct JobList {
    pub items: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

fn check_salary_range(min: Option<Decimal>, max: Option<Decimal>) -> Result<()> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(Error::BadRequest(
                "salary_min must not exceed salary_max".to_string(),
            ));
        }
    }
    Ok(())
}

fn clean_skills(skills: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for skill in skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            out.push(skill.to_string());
        }
    }
    out
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        let audit = AuditService::new(pool.clone());
        Self { pool, audit }
    }

    pub async fn create(&self, payload: CreateJobPayload, created_by: Option<Uuid>) -> Result<Job> {
        let status = match payload.status.as_deref() {
            Some(raw) => raw.parse::<JobStatus>().map_err(Error::BadRequest)?,
            None => JobStatus::Draft,
        };
        if !matches!(status, JobStatus::Draft | JobStatus::Active) {
            return Err(Error::BadRequest(
                "A new job must start as draft or active".to_string(),
            ));
        }
        check_salary_range(payload.salary_min, payload.salary_max)?;

        let query = format!(
            r#"
            INSERT INTO jobs (
                title, department, location, employment_type, description, requirements,
                skills, min_experience_years, salary_min, salary_max, openings, status,
                created_by, published_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10, $11, $12,
                $13, CASE WHEN $12 = 'active' THEN NOW() ELSE NULL END
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(payload.title.trim())
            .bind(payload.department)
            .bind(payload.location.trim())
            .bind(payload.employment_type)
            .bind(payload.description)
            .bind(payload.requirements)
            .bind(clean_skills(&payload.skills))
            .bind(payload.min_experience_years)
            .bind(payload.salary_min)
            .bind(payload.salary_max)
            .bind(payload.openings.unwrap_or(1))
            .bind(status.as_str())
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(job_id = %job.id, status = %job.status, "job created");
        Ok(job)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateJobPayload) -> Result<Job> {
        let current = self.get_by_id(id).await?;
        if current.status().is_terminal() {
            return Err(Error::Conflict(format!(
                "Job is {} and can no longer be edited",
                current.status
            )));
        }
        check_salary_range(
            payload.salary_min.or(current.salary_min),
            payload.salary_max.or(current.salary_max),
        )?;

        let query = format!(
            r#"
            UPDATE jobs
            SET
                title = COALESCE($2, title),
                department = COALESCE($3, department),
                location = COALESCE($4, location),
                employment_type = COALESCE($5, employment_type),
                description = COALESCE($6, description),
                requirements = COALESCE($7, requirements),
                skills = COALESCE($8, skills),
                min_experience_years = COALESCE($9, min_experience_years),
                salary_min = COALESCE($10, salary_min),
                salary_max = COALESCE($11, salary_max),
                openings = COALESCE($12, openings),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(payload.title.as_deref().map(str::trim))
            .bind(payload.department)
            .bind(payload.location.as_deref().map(str::trim))
            .bind(payload.employment_type)
            .bind(payload.description)
            .bind(payload.requirements)
            .bind(payload.skills.as_deref().map(clean_skills))
            .bind(payload.min_experience_years)
            .bind(payload.salary_min)
            .bind(payload.salary_max)
            .bind(payload.openings)
            .fetch_one(&self.pool)
            .await?;

        Ok(job)
    }

    /// Moves a job along its lifecycle; a request for the current status is a no-op.
    pub async fn transition(&self, id: Uuid, to: JobStatus, actor: Option<Uuid>) -> Result<Job> {
        let job = self.get_by_id(id).await?;
        let from = job.status();
        if from == to {
            return Ok(job);
        }
        if !from.can_transition_to(to) {
            let allowed: Vec<&str> = from.allowed_next().iter().map(|s| s.as_str()).collect();
            return Err(Error::Conflict(format!(
                "Cannot move job from {} to {} (allowed: {})",
                from,
                to,
                if allowed.is_empty() { "none".to_string() } else { allowed.join(", ") }
            )));
        }

        let query = format!(
            r#"
            UPDATE jobs
            SET
                status = $2,
                published_at = CASE WHEN $2 = 'active' THEN COALESCE(published_at, NOW()) ELSE published_at END,
                closed_at = CASE WHEN $2 IN ('closed', 'dropped') THEN NOW() ELSE closed_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let updated = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                Error::Conflict("Job status changed concurrently; reload and retry".to_string())
            })?;

        if let Err(e) = self
            .audit
            .log(
                actor,
                "status_changed",
                "job",
                id,
                Some(serde_json::json!({ "from": from.as_str(), "to": to.as_str() })),
            )
            .await
        {
            tracing::warn!(job_id = %id, error = ?e, "failed to write audit entry");
        }

        tracing::info!(job_id = %id, from = %from, to = %to, "job status changed");
        Ok(updated)
    }

    pub async fn list(&self, query: JobListQuery) -> Result<JobList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = query.status.filter(|s| !s.is_empty()) {
            let status = status.parse::<JobStatus>().map_err(Error::BadRequest)?;
            filters.push(format!("status = ${}", args.len() + 1));
            args.push(status.as_str().to_string());
        }
        if let Some(department) = query.department.filter(|s| !s.is_empty()) {
            filters.push(format!("department ILIKE ${}", args.len() + 1));
            args.push(format!("%{}%", department));
        }
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            let first = args.len() + 1;
            let second = first + 1;
            filters.push(format!(
                "(title ILIKE ${} OR location ILIKE ${})",
                first, second
            ));
            args.push(format!("%{}%", search));
            args.push(format!("%{}%", search));
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT {} FROM jobs {} ORDER BY COALESCE(published_at, created_at) DESC LIMIT ${} OFFSET ${}",
            JOB_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM jobs {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Job>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        items_statement = items_statement.bind(per_page).bind(offset);
        let items = items_statement.fetch_all(&self.pool).await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(JobList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Job> {
        let query = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }

    /// Only drafts are hard-deleted; published jobs must be dropped instead.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let job = self.get_by_id(id).await?;
        if job.status() != JobStatus::Draft {
            return Err(Error::Conflict(
                "Only draft jobs can be deleted; drop the job instead".to_string(),
            ));
        }
        sqlx::query("DELETE FROM jobs WHERE id = $1 AND status = 'draft'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<AuditLog>> {
        self.get_by_id(id).await?;
        self.audit.for_entity("job", id).await
    }

    pub async fn list_active(&self, limit: i64) -> Result<Vec<Job>> {
        let limit = if limit <= 0 { 20 } else { limit.min(100) };
        let query = format!(
            "SELECT {} FROM jobs WHERE status = 'active' ORDER BY COALESCE(published_at, created_at) DESC LIMIT $1",
            JOB_COLUMNS
        );
        let items = sqlx::query_as::<_, Job>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn get_active(&self, id: Uuid) -> Result<Job> {
        let job = self.get_by_id(id).await?;
        if job.status() != JobStatus::Active {
            return Err(Error::NotFound("Job not found".to_string()));
        }
        Ok(job)
    }

    pub async fn counts_by_status(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn salary_range_must_be_ordered() {
        let low = Decimal::from_str("1000").unwrap();
        let high = Decimal::from_str("2000").unwrap();
        assert!(check_salary_range(Some(low), Some(high)).is_ok());
        assert!(check_salary_range(Some(high), Some(low)).is_err());
        assert!(check_salary_range(None, Some(low)).is_ok());
    }

    #[test]
    fn skills_are_trimmed_and_deduplicated() {
        let skills = vec![" Rust ".to_string(), "rust".to_string(), "".to_string(), "SQL".to_string()];
        assert_eq!(clean_skills(&skills), vec!["Rust".to_string(), "SQL".to_string()]);
    }
}
