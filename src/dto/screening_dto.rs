use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::screening_token::{ScreeningPurpose, ScreeningToken};

fn validate_purpose(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<ScreeningPurpose>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_screening_purpose"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueTokenPayload {
    pub application_id: Uuid,
    #[validate(custom(function = "validate_purpose"))]
    pub purpose: String,
    #[validate(range(min = 1, max = 720))]
    pub ttl_hours: Option<i64>,
    #[serde(default = "default_true")]
    pub send_email: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokenResponse {
    pub token: ScreeningToken,
    pub link: String,
}

/// What the candidate sees when opening a screening link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningInfo {
    pub candidate_name: String,
    pub job_title: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublicSchedulePayload {
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub kind: Option<String>,
    #[validate(range(min = 15, max = 240))]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicInterviewResponse {
    pub interview_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: String,
    pub session_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_and_ttl_are_checked() {
        let mut payload = IssueTokenPayload {
            application_id: Uuid::new_v4(),
            purpose: "ai_screening".into(),
            ttl_hours: Some(48),
            send_email: true,
        };
        assert!(payload.validate().is_ok());
        payload.purpose = "lunch".into();
        assert!(payload.validate().is_err());
        payload.purpose = "schedule".into();
        payload.ttl_hours = Some(0);
        assert!(payload.validate().is_err());
    }
}
