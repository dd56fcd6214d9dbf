use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub stage: String,
    pub match_score: Option<i32>,
    pub match_summary: Option<String>,
    pub match_details: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn stage(&self) -> ApplicationStage {
        self.stage.parse().unwrap_or(ApplicationStage::Applied)
    }
}

/// Application joined with the names a recruiter sees in lists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_id: Uuid,
    pub job_title: String,
    pub stage: String,
    pub match_score: Option<i32>,
    pub match_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStage {
    Applied,
    Screening,
    Shortlisted,
    Interviewing,
    Offered,
    Hired,
    Rejected,
    Withdrawn,
}

impl ApplicationStage {
    pub const ALL: [ApplicationStage; 8] = [
        ApplicationStage::Applied,
        ApplicationStage::Screening,
        ApplicationStage::Shortlisted,
        ApplicationStage::Interviewing,
        ApplicationStage::Offered,
        ApplicationStage::Hired,
        ApplicationStage::Rejected,
        ApplicationStage::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStage::Applied => "applied",
            ApplicationStage::Screening => "screening",
            ApplicationStage::Shortlisted => "shortlisted",
            ApplicationStage::Interviewing => "interviewing",
            ApplicationStage::Offered => "offered",
            ApplicationStage::Hired => "hired",
            ApplicationStage::Rejected => "rejected",
            ApplicationStage::Withdrawn => "withdrawn",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStage::Hired | ApplicationStage::Rejected | ApplicationStage::Withdrawn
        )
    }

    /// Any non-terminal stage may move anywhere except back to `applied`.
    pub fn can_move_to(&self, next: ApplicationStage) -> bool {
        !self.is_terminal() && next != ApplicationStage::Applied && next != *self
    }
}

impl std::fmt::Display for ApplicationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStage::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown application stage '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_stages_are_final() {
        for stage in [ApplicationStage::Hired, ApplicationStage::Rejected, ApplicationStage::Withdrawn] {
            for next in ApplicationStage::ALL {
                assert!(!stage.can_move_to(next));
            }
        }
    }

    #[test]
    fn cannot_return_to_applied() {
        assert!(!ApplicationStage::Shortlisted.can_move_to(ApplicationStage::Applied));
        assert!(ApplicationStage::Applied.can_move_to(ApplicationStage::Rejected));
        assert!(ApplicationStage::Screening.can_move_to(ApplicationStage::Interviewing));
    }
}
