use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 240;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: Uuid,
    pub application_id: Uuid,
    pub kind: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub interviewer: Option<String>,
    pub location: Option<String>,
    pub external_session_id: Option<String>,
    pub session_url: Option<String>,
    pub transcript: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Interview {
    pub fn status(&self) -> InterviewStatus {
        self.status.parse().unwrap_or(InterviewStatus::Scheduled)
    }

    pub fn kind(&self) -> InterviewKind {
        self.kind.parse().unwrap_or(InterviewKind::Video)
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewKind {
    Ai,
    Phone,
    Video,
    Onsite,
}

impl InterviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewKind::Ai => "ai",
            InterviewKind::Phone => "phone",
            InterviewKind::Video => "video",
            InterviewKind::Onsite => "onsite",
        }
    }
}

impl std::str::FromStr for InterviewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(InterviewKind::Ai),
            "phone" => Ok(InterviewKind::Phone),
            "video" => Ok(InterviewKind::Video),
            "onsite" => Ok(InterviewKind::Onsite),
            other => Err(format!("unknown interview kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
            InterviewStatus::NoShow => "no_show",
        }
    }

    pub fn can_transition_to(&self, next: InterviewStatus) -> bool {
        use InterviewStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress)
                | (Scheduled, Completed)
                | (Scheduled, Cancelled)
                | (Scheduled, NoShow)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }
}

impl std::str::FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(InterviewStatus::Scheduled),
            "in_progress" => Ok(InterviewStatus::InProgress),
            "completed" => Ok(InterviewStatus::Completed),
            "cancelled" => Ok(InterviewStatus::Cancelled),
            "no_show" => Ok(InterviewStatus::NoShow),
            other => Err(format!("unknown interview status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Evaluation {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub overall_score: i32,
    pub recommendation: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub summary: String,
    pub criteria: Option<JsonValue>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongHire,
    Hire,
    NoHire,
    StrongNoHire,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongHire => "strong_hire",
            Recommendation::Hire => "hire",
            Recommendation::NoHire => "no_hire",
            Recommendation::StrongNoHire => "strong_no_hire",
        }
    }

    /// Used when the evaluator omits or garbles its recommendation.
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 85 => Recommendation::StrongHire,
            s if s >= 65 => Recommendation::Hire,
            s if s >= 35 => Recommendation::NoHire,
            _ => Recommendation::StrongNoHire,
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match key.as_str() {
            "strong_hire" | "strong_yes" => Some(Recommendation::StrongHire),
            "hire" | "yes" => Some(Recommendation::Hire),
            "no_hire" | "no" => Some(Recommendation::NoHire),
            "strong_no_hire" | "strong_no" => Some(Recommendation::StrongNoHire),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interview_status_moves_forward_only() {
        assert!(InterviewStatus::Scheduled.can_transition_to(InterviewStatus::InProgress));
        assert!(InterviewStatus::InProgress.can_transition_to(InterviewStatus::Completed));
        assert!(!InterviewStatus::Completed.can_transition_to(InterviewStatus::Scheduled));
        assert!(!InterviewStatus::Cancelled.can_transition_to(InterviewStatus::InProgress));
        assert!(!InterviewStatus::InProgress.can_transition_to(InterviewStatus::NoShow));
    }

    #[test]
    fn recommendation_parsing_is_lenient() {
        assert_eq!(Recommendation::parse_lenient("Strong Hire"), Some(Recommendation::StrongHire));
        assert_eq!(Recommendation::parse_lenient("no-hire"), Some(Recommendation::NoHire));
        assert_eq!(Recommendation::parse_lenient("maybe"), None);
        assert_eq!(Recommendation::from_score(90), Recommendation::StrongHire);
        assert_eq!(Recommendation::from_score(10), Recommendation::StrongNoHire);
    }
}
