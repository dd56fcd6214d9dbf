use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::job::{Job, JobStatus};
use crate::services::job_service::JobList;

fn validate_job_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<JobStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_job_status"))
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    #[validate(length(max = 200), custom(function = "validate_not_blank"))]
    pub title: String,
    pub department: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub location: String,
    pub employment_type: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,
    pub requirements: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[validate(range(min = 0, max = 50))]
    pub min_experience_years: Option<i32>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    #[validate(range(min = 1, max = 1000))]
    pub openings: Option<i32>,
    #[validate(custom(function = "validate_job_status"))]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateJobPayload {
    #[validate(length(max = 200), custom(function = "validate_not_blank"))]
    pub title: Option<String>,
    pub department: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub location: Option<String>,
    pub employment_type: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub skills: Option<Vec<String>>,
    #[validate(range(min = 0, max = 50))]
    pub min_experience_years: Option<i32>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    #[validate(range(min = 1, max = 1000))]
    pub openings: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionJobPayload {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: uuid::Uuid,
    pub title: String,
    pub department: Option<String>,
    pub location: String,
    pub employment_type: Option<String>,
    pub description: String,
    pub requirements: Option<String>,
    pub skills: Vec<String>,
    pub min_experience_years: Option<i32>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub openings: i32,
    pub status: String,
    pub allowed_transitions: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPublicSummary {
    pub id: uuid::Uuid,
    pub title: String,
    pub department: Option<String>,
    pub location: String,
    pub employment_type: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub items: Vec<JobResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPublicListResponse {
    pub items: Vec<JobPublicSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobPublicQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateJobDescriptionPayload {
    #[validate(length(min = 1))]
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub notes: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(value: Job) -> Self {
        let allowed_transitions = value
            .status()
            .allowed_next()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        Self {
            id: value.id,
            title: value.title,
            department: value.department,
            location: value.location,
            employment_type: value.employment_type,
            description: value.description,
            requirements: value.requirements,
            skills: value.skills,
            min_experience_years: value.min_experience_years,
            salary_min: value.salary_min,
            salary_max: value.salary_max,
            openings: value.openings,
            status: value.status,
            allowed_transitions,
            published_at: value.published_at,
            closed_at: value.closed_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<Job> for JobPublicSummary {
    fn from(value: Job) -> Self {
        let trimmed = value.description.trim();
        let summary = if trimmed.chars().count() > 320 {
            format!("{}…", trimmed.chars().take(320).collect::<String>())
        } else {
            trimmed.to_string()
        };

        Self {
            id: value.id,
            title: value.title,
            department: value.department,
            location: value.location,
            employment_type: value.employment_type,
            salary_min: value.salary_min,
            salary_max: value.salary_max,
            summary,
            published_at: value.published_at,
        }
    }
}

impl From<JobList> for JobListResponse {
    fn from(value: JobList) -> Self {
        Self {
            items: value.items.into_iter().map(Into::into).collect(),
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateJobPayload {
        CreateJobPayload {
            title: "Data Engineer".into(),
            department: None,
            location: "Berlin".into(),
            employment_type: None,
            description: "Pipelines".into(),
            requirements: None,
            skills: vec![],
            min_experience_years: Some(3),
            salary_min: None,
            salary_max: None,
            openings: None,
            status: None,
        }
    }

    #[test]
    fn rejects_unknown_initial_status() {
        let mut p = payload();
        assert!(p.validate().is_ok());
        p.status = Some("archived".into());
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_blank_title() {
        let mut p = payload();
        p.title = String::new();
        assert!(p.validate().is_err());
        p.title = "   \t ".into();
        assert!(p.validate().is_err());
        p.title = "  Data Engineer ".into();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn update_rejects_whitespace_only_fields() {
        let update = UpdateJobPayload {
            title: Some("  ".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        let update = UpdateJobPayload {
            location: Some("\n".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(UpdateJobPayload::default().validate().is_ok());
    }
}
