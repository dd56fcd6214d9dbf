use crate::dto::candidate_dto::NewCandidate;
use crate::error::{Error, Result};
use crate::models::application::Application;
use crate::models::bulk_job::{bulk_status, drive_status, BulkJob, DriveCandidate, MAX_FILES_PER_BULK_JOB};
use crate::models::candidate::{Candidate, CandidateSource};
use crate::models::job::{Job, JobStatus};
use crate::services::ai_service::AIService;
use crate::services::application_service::ApplicationService;
use crate::services::candidate_service::CandidateService;
use crate::services::job_service::JobService;
use crate::services::matching::MatchResult;
use crate::services::resume_extractor::{self, sniff_format, ContactDetails};
use crate::utils::files;
use bytes::Bytes;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const BULK_JOB_COLUMNS: &str = "id, job_id, status, total_files, processed_files, failed_files, error, created_by, created_at, started_at, finished_at, updated_at";
const TIMED_OUT: &str = "Processing timed out";
const DRIVE_CANDIDATE_COLUMNS: &str = "id, bulk_job_id, job_id, file_name, file_path, position, status, name, email, phone, resume_text, match_score, match_summary, match_details, error, candidate_id, created_at, updated_at";

pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

struct PreparedFile {
    file_name: String,
    path: String,
    error: Option<String>,
}

struct Screened {
    contacts: ContactDetails,
    text: String,
    result: MatchResult,
}

#[derive(Clone)]
pub struct BulkService {
    pool: PgPool,
    jobs: JobService,
    candidates: CandidateService,
    applications: ApplicationService,
}

async fn fail_pending_files(
    tx: &mut Transaction<'_, Postgres>,
    bulk_job_ids: &[Uuid],
    message: &str,
) -> Result<()> {
    if bulk_job_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "UPDATE drive_candidates SET status = 'failed', error = $2, updated_at = NOW() WHERE bulk_job_id = ANY($1) AND status = 'pending'",
    )
    .bind(bulk_job_ids)
    .bind(message)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl BulkService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: JobService::new(pool.clone()),
            candidates: CandidateService::new(pool.clone()),
            applications: ApplicationService::new(pool.clone()),
            pool,
        }
    }

    /// Stores the uploaded resumes and queues them for screening against an active job.
    pub async fn create(
        &self,
        job_id: Uuid,
        uploads: Vec<UploadedFile>,
        created_by: Option<Uuid>,
    ) -> Result<BulkJob> {
        if uploads.is_empty() {
            return Err(Error::BadRequest("At least one file is required".to_string()));
        }
        if uploads.len() > MAX_FILES_PER_BULK_JOB {
            return Err(Error::BadRequest(format!(
                "A bulk upload accepts at most {} files",
                MAX_FILES_PER_BULK_JOB
            )));
        }
        let job = self.jobs.get_by_id(job_id).await?;
        if job.status() != JobStatus::Active {
            return Err(Error::Conflict(
                "Resumes can only be screened against an active job".to_string(),
            ));
        }

        // Unusable files are recorded as failed entries; the rest of the batch still goes ahead.
        let mut prepared = Vec::with_capacity(uploads.len());
        let mut written: Vec<String> = Vec::new();
        for upload in &uploads {
            let file_name = files::sanitize_file_name(&upload.file_name);
            if let Some(problem) = files::upload_problem(&upload.data) {
                tracing::warn!(%job_id, file = %file_name, error = %problem, "bulk upload file refused");
                prepared.push(PreparedFile {
                    file_name,
                    path: String::new(),
                    error: Some(problem),
                });
                continue;
            }
            let extension = sniff_format(&upload.data).extension();
            match files::store_upload("bulk", extension, &upload.data).await {
                Ok(path) => {
                    written.push(path.clone());
                    prepared.push(PreparedFile {
                        file_name,
                        path,
                        error: None,
                    });
                }
                Err(e) => {
                    files::remove_uploads(&written).await;
                    return Err(e);
                }
            }
        }

        match self.insert_batch(job_id, &prepared, created_by).await {
            Ok(bulk_job) => {
                tracing::info!(
                    bulk_job_id = %bulk_job.id,
                    %job_id,
                    files = bulk_job.total_files,
                    refused = bulk_job.failed_files,
                    "bulk screening queued"
                );
                Ok(bulk_job)
            }
            Err(e) => {
                files::remove_uploads(&written).await;
                Err(e)
            }
        }
    }

    async fn insert_batch(
        &self,
        job_id: Uuid,
        prepared: &[PreparedFile],
        created_by: Option<Uuid>,
    ) -> Result<BulkJob> {
        let refused = prepared.iter().filter(|f| f.error.is_some()).count();
        let mut tx = self.pool.begin().await?;
        let query = format!(
            r#"
            INSERT INTO bulk_jobs (job_id, status, total_files, failed_files, created_by)
            VALUES ($1, 'pending', $2, $3, $4)
            RETURNING {}
            "#,
            BULK_JOB_COLUMNS
        );
        let bulk_job = sqlx::query_as::<_, BulkJob>(&query)
            .bind(job_id)
            .bind(prepared.len() as i32)
            .bind(refused as i32)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        for (position, file) in prepared.iter().enumerate() {
            let status = if file.error.is_some() {
                drive_status::FAILED
            } else {
                drive_status::PENDING
            };
            sqlx::query(
                r#"
                INSERT INTO drive_candidates (bulk_job_id, job_id, file_name, file_path, position, status, error)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(bulk_job.id)
            .bind(job_id)
            .bind(&file.file_name)
            .bind(&file.path)
            .bind(position as i32)
            .bind(status)
            .bind(&file.error)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(bulk_job)
    }

    pub async fn get(&self, id: Uuid) -> Result<BulkJob> {
        let query = format!("SELECT {} FROM bulk_jobs WHERE id = $1", BULK_JOB_COLUMNS);
        sqlx::query_as::<_, BulkJob>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Bulk job not found".to_string()))
    }

    pub async fn list(&self, job_id: Option<Uuid>, limit: i64) -> Result<Vec<BulkJob>> {
        let limit = if limit <= 0 { 20 } else { limit.min(100) };
        let query = format!(
            "SELECT {} FROM bulk_jobs WHERE ($1::uuid IS NULL OR job_id = $1) ORDER BY created_at DESC LIMIT $2",
            BULK_JOB_COLUMNS
        );
        let items = sqlx::query_as::<_, BulkJob>(&query)
            .bind(job_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Screened resumes best-first, then pending and failed ones in upload order.
    pub async fn drive_candidates(&self, bulk_job_id: Uuid) -> Result<Vec<DriveCandidate>> {
        self.get(bulk_job_id).await?;
        let query = format!(
            "SELECT {} FROM drive_candidates WHERE bulk_job_id = $1 ORDER BY match_score DESC NULLS LAST, position ASC",
            DRIVE_CANDIDATE_COLUMNS
        );
        let items = sqlx::query_as::<_, DriveCandidate>(&query)
            .bind(bulk_job_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn get_drive_candidate(&self, id: Uuid) -> Result<DriveCandidate> {
        let query = format!("SELECT {} FROM drive_candidates WHERE id = $1", DRIVE_CANDIDATE_COLUMNS);
        sqlx::query_as::<_, DriveCandidate>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Screened resume not found".to_string()))
    }

    /// Claims the oldest pending batch and screens every file in it.
    /// Returns `false` when there was nothing to do.
    pub async fn run_once(&self, ai: &AIService) -> Result<bool> {
        let claimed = sqlx::query(
            r#"
            UPDATE bulk_jobs SET status = 'processing', started_at = NOW(), updated_at = NOW()
            WHERE id = (
                SELECT id FROM bulk_jobs WHERE status = 'pending' ORDER BY created_at ASC FOR UPDATE SKIP LOCKED LIMIT 1
            )
            RETURNING id, job_id
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = claimed else { return Ok(false) };
        let bulk_job_id: Uuid = row.try_get("id")?;
        let job_id: Uuid = row.try_get("job_id")?;

        let job = match self.jobs.get_by_id(job_id).await {
            Ok(job) if job.status() == JobStatus::Active => job,
            Ok(job) => {
                let message = format!("Target job is {} and no longer takes applications", job.status);
                self.fail_batch(bulk_job_id, &message).await?;
                tracing::warn!(%bulk_job_id, %job_id, "bulk screening abandoned: job closed");
                return Ok(true);
            }
            Err(Error::NotFound(_)) => {
                self.fail_batch(bulk_job_id, "Target job no longer exists").await?;
                tracing::warn!(%bulk_job_id, %job_id, "bulk screening abandoned: job missing");
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        let query = format!(
            "SELECT {} FROM drive_candidates WHERE bulk_job_id = $1 AND status = 'pending' ORDER BY position ASC",
            DRIVE_CANDIDATE_COLUMNS
        );
        let pending = sqlx::query_as::<_, DriveCandidate>(&query)
            .bind(bulk_job_id)
            .fetch_all(&self.pool)
            .await?;

        for drive_candidate in pending {
            let still_running = match self.screen_file(&drive_candidate, &job, ai).await {
                Ok(screened) => self.record_screened(&drive_candidate, screened).await?,
                Err(message) => {
                    tracing::warn!(
                        bulk_job_id = %bulk_job_id,
                        file = %drive_candidate.file_name,
                        error = %message,
                        "resume screening failed"
                    );
                    self.record_failed(&drive_candidate, &message).await?
                }
            };
            if !still_running {
                tracing::warn!(%bulk_job_id, "bulk job was closed by the sweep; stopping");
                return Ok(true);
            }
        }

        if self.complete(bulk_job_id).await? {
            tracing::info!(%bulk_job_id, "bulk screening completed");
        }
        Ok(true)
    }

    async fn screen_file(
        &self,
        drive_candidate: &DriveCandidate,
        job: &Job,
        ai: &AIService,
    ) -> std::result::Result<Screened, String> {
        let data = files::read_upload(&drive_candidate.file_path)
            .await
            .map_err(|e| e.to_string())?;
        let extracted = resume_extractor::extract_text(Bytes::from(data))
            .await
            .map_err(|e| e.to_string())?;
        let contacts = resume_extractor::extract_contacts(&extracted.text);
        let result = ai
            .score_resume(&extracted.text, job)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Screened {
            contacts,
            text: extracted.text,
            result,
        })
    }

    /// Returns `false` when the batch is no longer processing; nothing is written then.
    async fn record_screened(&self, drive_candidate: &DriveCandidate, screened: Screened) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE drive_candidates
            SET status = $2, name = $3, email = $4, phone = $5, resume_text = $6,
                match_score = $7, match_summary = $8, match_details = $9, error = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(drive_candidate.id)
        .bind(drive_status::SCREENED)
        .bind(screened.contacts.name)
        .bind(screened.contacts.email)
        .bind(screened.contacts.phone)
        .bind(screened.text)
        .bind(screened.result.score.clamp(0, 100))
        .bind(&screened.result.summary)
        .bind(screened.result.details())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Ok(false);
        }
        let touched = sqlx::query(
            "UPDATE bulk_jobs SET processed_files = processed_files + 1, updated_at = NOW() WHERE id = $1 AND status = 'processing'",
        )
        .bind(drive_candidate.bulk_job_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if touched == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn record_failed(&self, drive_candidate: &DriveCandidate, message: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE drive_candidates SET status = $2, error = $3, updated_at = NOW() WHERE id = $1 AND status = 'pending'",
        )
        .bind(drive_candidate.id)
        .bind(drive_status::FAILED)
        .bind(message)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Ok(false);
        }
        let touched = sqlx::query(
            "UPDATE bulk_jobs SET failed_files = failed_files + 1, updated_at = NOW() WHERE id = $1 AND status = 'processing'",
        )
        .bind(drive_candidate.bulk_job_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if touched == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Only a batch still marked processing can finish; the sweep may have failed it already.
    async fn complete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bulk_jobs SET status = $2, error = NULL, finished_at = NOW(), updated_at = NOW() WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(bulk_status::COMPLETED)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fail_batch(&self, id: Uuid, message: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let failed: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE bulk_jobs
            SET status = 'failed', error = $2, finished_at = NOW(), updated_at = NOW(),
                failed_files = failed_files + (
                    SELECT COUNT(*)::int FROM drive_candidates d
                    WHERE d.bulk_job_id = bulk_jobs.id AND d.status = 'pending'
                )
            WHERE id = $1 AND status = 'processing'
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(message)
        .fetch_all(&mut *tx)
        .await?;
        fail_pending_files(&mut tx, &failed, message).await?;
        tx.commit().await?;
        Ok(!failed.is_empty())
    }

    /// Fails batches that recorded no progress for the given time, with their unscreened files.
    pub async fn fail_stuck(&self, idle_minutes: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let failed: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE bulk_jobs
            SET status = 'failed', error = $2, finished_at = NOW(), updated_at = NOW(),
                failed_files = failed_files + (
                    SELECT COUNT(*)::int FROM drive_candidates d
                    WHERE d.bulk_job_id = bulk_jobs.id AND d.status = 'pending'
                )
            WHERE status = 'processing' AND updated_at < NOW() - make_interval(mins => $1::int)
            RETURNING id
            "#,
        )
        .bind(idle_minutes as i32)
        .bind(TIMED_OUT)
        .fetch_all(&mut *tx)
        .await?;
        fail_pending_files(&mut tx, &failed, TIMED_OUT).await?;
        tx.commit().await?;
        Ok(failed.len() as u64)
    }

    /// Turns a screened resume into a candidate (reused by email) with an application for the job.
    pub async fn import(
        &self,
        drive_candidate_id: Uuid,
    ) -> Result<(DriveCandidate, Candidate, Application, bool)> {
        let drive_candidate = self.get_drive_candidate(drive_candidate_id).await?;
        if drive_candidate.status != drive_status::SCREENED {
            return Err(Error::Conflict(format!(
                "Only screened resumes can be imported (status is {})",
                drive_candidate.status
            )));
        }
        let email = drive_candidate
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                Error::BadRequest("No email address was found in this resume".to_string())
            })?;

        let (candidate, created) = match self.candidates.find_by_email(&email).await? {
            Some(existing) => (existing, false),
            None => {
                let name = drive_candidate
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| email.split('@').next().unwrap_or("Candidate").to_string());
                let new = NewCandidate {
                    name,
                    email: email.clone(),
                    phone: drive_candidate.phone.clone(),
                    resume_path: Some(drive_candidate.file_path.clone()),
                    resume_text: drive_candidate.resume_text.clone(),
                    ..Default::default()
                };
                (self.candidates.create(new, CandidateSource::Bulk).await?, true)
            }
        };

        let application = match self.applications.find(candidate.id, drive_candidate.job_id).await? {
            Some(existing) => existing,
            None => self.applications.apply(candidate.id, drive_candidate.job_id).await?,
        };
        let application = match drive_candidate.match_details.clone() {
            Some(details) => {
                let result: Option<MatchResult> = serde_json::from_value(details).ok();
                match result {
                    Some(result) => self.applications.set_score(application.id, &result).await?,
                    None => application,
                }
            }
            None => application,
        };

        let query = format!(
            r#"
            UPDATE drive_candidates SET status = 'imported', candidate_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'screened'
            RETURNING {}
            "#,
            DRIVE_CANDIDATE_COLUMNS
        );
        let updated = sqlx::query_as::<_, DriveCandidate>(&query)
            .bind(drive_candidate_id)
            .bind(candidate.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Conflict("Resume was already imported or rejected".to_string()))?;

        tracing::info!(drive_candidate_id = %drive_candidate_id, candidate_id = %candidate.id, created, "screened resume imported");
        Ok((updated, candidate, application, created))
    }

    pub async fn reject(&self, drive_candidate_id: Uuid) -> Result<DriveCandidate> {
        let drive_candidate = self.get_drive_candidate(drive_candidate_id).await?;
        if drive_candidate.status != drive_status::SCREENED {
            return Err(Error::Conflict(format!(
                "Only screened resumes can be rejected (status is {})",
                drive_candidate.status
            )));
        }
        let query = format!(
            "UPDATE drive_candidates SET status = 'rejected', updated_at = NOW() WHERE id = $1 AND status = 'screened' RETURNING {}",
            DRIVE_CANDIDATE_COLUMNS
        );
        sqlx::query_as::<_, DriveCandidate>(&query)
            .bind(drive_candidate_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Conflict("Resume was already imported or rejected".to_string()))
    }
}
