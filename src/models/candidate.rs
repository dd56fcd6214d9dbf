use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_title: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Vec<String>,
    pub resume_path: Option<String>,
    #[serde(skip_serializing)]
    pub resume_text: Option<String>,
    pub source: String,
    pub notes: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Resume text plus profile fields, for scoring candidates with thin resumes.
    pub fn profile_text(&self) -> String {
        let mut text = self.resume_text.clone().unwrap_or_default();
        if let Some(title) = &self.current_title {
            text.push_str(&format!("\nCurrent title: {}", title));
        }
        if let Some(years) = self.experience_years {
            text.push_str(&format!("\n{} years of experience", years));
        }
        if !self.skills.is_empty() {
            text.push_str(&format!("\nSkills: {}", self.skills.join(", ")));
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Manual,
    Bulk,
    Email,
    Drive,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Manual => "manual",
            CandidateSource::Bulk => "bulk",
            CandidateSource::Email => "email",
            CandidateSource::Drive => "drive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: Option<String>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InboundEmail {
    pub id: Uuid,
    pub candidate_id: Option<Uuid>,
    pub from_address: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub attachment_names: Vec<String>,
    pub received_at: DateTime<Utc>,
}

/// Lowercased, trimmed form used for uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_email_for_uniqueness() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }
}
