use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::candidate::Candidate;
use crate::services::candidate_service::CandidateList;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_title: Option<String>,
    #[validate(range(min = 0, max = 60))]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCandidatePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_title: Option<String>,
    #[validate(range(min = 0, max = 60))]
    pub experience_years: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CandidateListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub skill: Option<String>,
    pub include_archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateListResponse {
    pub items: Vec<Candidate>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl From<CandidateList> for CandidateListResponse {
    fn from(value: CandidateList) -> Self {
        Self {
            items: value.items,
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}

/// Fields collected when a resume (bulk, email) creates a candidate.
#[derive(Debug, Clone, Default)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_title: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Vec<String>,
    pub notes: Option<String>,
    pub resume_path: Option<String>,
    pub resume_text: Option<String>,
}

impl From<CreateCandidatePayload> for NewCandidate {
    fn from(p: CreateCandidatePayload) -> Self {
        Self {
            name: p.name,
            email: p.email,
            phone: p.phone,
            location: p.location,
            current_title: p.current_title,
            experience_years: p.experience_years,
            skills: p.skills,
            notes: p.notes,
            resume_path: None,
            resume_text: None,
        }
    }
}
