use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::application::Application;
use crate::models::bulk_job::{BulkJob, DriveCandidate};
use crate::models::candidate::Candidate;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BulkJobListQuery {
    pub job_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Progress snapshot polled by the client while a batch is screened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJobProgress {
    #[serde(flatten)]
    pub bulk_job: BulkJob,
    pub percent: i32,
}

impl From<BulkJob> for BulkJobProgress {
    fn from(bulk_job: BulkJob) -> Self {
        let done = bulk_job.processed_files + bulk_job.failed_files;
        let percent = if bulk_job.total_files <= 0 {
            0
        } else {
            (done * 100 / bulk_job.total_files).clamp(0, 100)
        };
        Self { bulk_job, percent }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveCandidateListResponse {
    pub bulk_job: BulkJobProgress,
    pub items: Vec<DriveCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub drive_candidate: DriveCandidate,
    pub candidate: Candidate,
    pub application: Application,
    pub created_candidate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn progress_counts_failed_files_as_done() {
        let bulk = BulkJob {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            status: "processing".into(),
            total_files: 8,
            processed_files: 3,
            failed_files: 1,
            error: None,
            created_by: None,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            finished_at: None,
            updated_at: Utc::now(),
        };
        assert_eq!(BulkJobProgress::from(bulk).percent, 50);
    }
}
