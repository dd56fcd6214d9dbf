use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::interview::{
    Evaluation, Interview, InterviewKind, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};

pub const DEFAULT_DURATION_MINUTES: i32 = 45;

fn validate_kind(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<InterviewKind>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_interview_kind"))
}

fn default_kind() -> String {
    InterviewKind::Video.as_str().to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScheduleInterviewPayload {
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 240))]
    pub duration_minutes: Option<i32>,
    #[serde(default = "default_kind")]
    #[validate(custom(function = "validate_kind"))]
    pub kind: String,
    pub interviewer: Option<String>,
    pub location: Option<String>,
    #[serde(default = "default_true")]
    pub notify_candidate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RescheduleInterviewPayload {
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 240))]
    pub duration_minutes: Option<i32>,
    #[serde(default = "default_true")]
    pub notify_candidate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelInterviewPayload {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notify_candidate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteInterviewPayload {
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InterviewListQuery {
    pub status: Option<String>,
    pub application_id: Option<Uuid>,
    /// Only interviews starting within the next N days.
    pub upcoming_days: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewDetail {
    #[serde(flatten)]
    pub interview: Interview,
    pub ends_at: DateTime<Utc>,
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSessionResponse {
    pub interview: Interview,
    pub session_url: Option<String>,
    pub evaluation: Option<Evaluation>,
}

/// Start must be in the future and the length within the allowed window.
pub fn check_schedule(
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
    now: DateTime<Utc>,
) -> std::result::Result<(), String> {
    if scheduled_at <= now {
        return Err("Interview must be scheduled in the future".to_string());
    }
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(format!(
            "Interview duration must be between {} and {} minutes",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn schedule_must_be_future_and_bounded() {
        let now = Utc::now();
        assert!(check_schedule(now + Duration::hours(1), 45, now).is_ok());
        assert!(check_schedule(now - Duration::minutes(1), 45, now).is_err());
        assert!(check_schedule(now, 45, now).is_err());
        assert!(check_schedule(now + Duration::hours(1), 14, now).is_err());
        assert!(check_schedule(now + Duration::hours(1), 241, now).is_err());
        assert!(check_schedule(now + Duration::hours(1), 240, now).is_ok());
    }

    #[test]
    fn payload_defaults_to_video_with_notification() {
        let payload: ScheduleInterviewPayload = serde_json::from_value(serde_json::json!({
            "scheduled_at": "2030-01-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(payload.kind, "video");
        assert!(payload.notify_candidate);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_kind_and_long_duration() {
        let payload: ScheduleInterviewPayload = serde_json::from_value(serde_json::json!({
            "scheduled_at": "2030-01-01T10:00:00Z",
            "kind": "carrier-pigeon",
            "duration_minutes": 500
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("kind"));
        assert!(fields.contains_key("duration_minutes"));
    }
}
