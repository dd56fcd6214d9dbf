use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
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
    pub created_by: Option<Uuid>,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        self.status.parse().unwrap_or(JobStatus::Draft)
    }

    /// Text the matcher scores resumes against.
    pub fn matching_brief(&self) -> String {
        let mut brief = format!("{}\n\n{}", self.title, self.description);
        if let Some(req) = self.requirements.as_deref().filter(|r| !r.trim().is_empty()) {
            brief.push_str("\n\nRequirements:\n");
            brief.push_str(req);
        }
        if !self.skills.is_empty() {
            brief.push_str("\n\nSkills: ");
            brief.push_str(&self.skills.join(", "));
        }
        if let Some(years) = self.min_experience_years {
            brief.push_str(&format!("\nMinimum experience: {} years", years));
        }
        brief
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    Active,
    Closed,
    Dropped,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Draft,
        JobStatus::Active,
        JobStatus::Closed,
        JobStatus::Dropped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Active => "active",
            JobStatus::Closed => "closed",
            JobStatus::Dropped => "dropped",
        }
    }

    /// Statuses reachable from `self` in one step.
    pub fn allowed_next(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Draft => &[JobStatus::Active, JobStatus::Dropped],
            JobStatus::Active => &[JobStatus::Closed, JobStatus::Dropped],
            JobStatus::Closed | JobStatus::Dropped => &[],
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown job status '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(JobStatus::Draft.can_transition_to(JobStatus::Active));
        assert!(JobStatus::Draft.can_transition_to(JobStatus::Dropped));
        assert!(JobStatus::Active.can_transition_to(JobStatus::Closed));
        assert!(JobStatus::Active.can_transition_to(JobStatus::Dropped));
    }

    #[test]
    fn closed_and_dropped_are_terminal() {
        for terminal in [JobStatus::Closed, JobStatus::Dropped] {
            assert!(terminal.is_terminal());
            for next in JobStatus::ALL {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn no_backward_or_skipping_moves() {
        assert!(!JobStatus::Active.can_transition_to(JobStatus::Draft));
        assert!(!JobStatus::Closed.can_transition_to(JobStatus::Active));
        assert!(!JobStatus::Draft.can_transition_to(JobStatus::Closed));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("ACTIVE".parse::<JobStatus>(), Ok(JobStatus::Active));
        assert!("archived".parse::<JobStatus>().is_err());
    }
}
