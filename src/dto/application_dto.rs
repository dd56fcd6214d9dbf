use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::application::{ApplicationStage, ApplicationSummary};
use crate::services::application_service::ApplicationList;

fn validate_stage(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<ApplicationStage>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_application_stage"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateApplicationPayload {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    /// Score the resume right away instead of leaving the application unscored.
    #[serde(default = "default_true")]
    pub score: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStagePayload {
    #[validate(custom(function = "validate_stage"))]
    pub stage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    pub job_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    pub stage: Option<String>,
    pub min_score: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationListResponse {
    pub items: Vec<ApplicationSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl From<ApplicationList> for ApplicationListResponse {
    fn from(value: ApplicationList) -> Self {
        Self {
            items: value.items,
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

    #[test]
    fn stage_must_be_known() {
        assert!(UpdateStagePayload { stage: "shortlisted".into() }.validate().is_ok());
        assert!(UpdateStagePayload { stage: "ghosted".into() }.validate().is_err());
    }

    #[test]
    fn scoring_defaults_on() {
        let payload: CreateApplicationPayload = serde_json::from_value(serde_json::json!({
            "candidate_id": Uuid::nil(),
            "job_id": Uuid::nil(),
        }))
        .unwrap();
        assert!(payload.score);
    }
}
