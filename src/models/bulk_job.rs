use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_FILES_PER_BULK_JOB: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BulkJob {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub total_files: i32,
    pub processed_files: i32,
    pub failed_files: i32,
    pub error: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriveCandidate {
    pub id: Uuid,
    pub bulk_job_id: Uuid,
    pub job_id: Uuid,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub position: i32,
    pub status: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub resume_text: Option<String>,
    pub match_score: Option<i32>,
    pub match_summary: Option<String>,
    pub match_details: Option<JsonValue>,
    pub error: Option<String>,
    pub candidate_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub mod bulk_status {
    pub const PENDING: &str = "pending";
    pub const PROCESSING: &str = "processing";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

pub mod drive_status {
    pub const PENDING: &str = "pending";
    pub const SCREENED: &str = "screened";
    pub const FAILED: &str = "failed";
    pub const IMPORTED: &str = "imported";
    pub const REJECTED: &str = "rejected";
}
