use crate::config::{Config, MatcherProvider};
use crate::dto::job_dto::GenerateJobDescriptionPayload;
use crate::error::Result;
use crate::models::interview::Recommendation;
use crate::models::job::Job;
use crate::services::llm_client::{LlmClient, LlmError, LlmProvider};
use crate::services::matching::{self, clamp_score, MatchResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

const MAX_RESUME_CHARS: usize = 12_000;
const MAX_TRANSCRIPT_CHARS: usize = 30_000;

const MATCH_SYSTEM_PROMPT: &str = r#"You are an experienced technical recruiter screening resumes.
Compare the resume with the job and answer with a JSON object:
{"score": 0-100, "skills_score": 0-100, "experience_score": 0-100, "education_score": 0-100,
 "summary": "two or three sentences", "strengths": ["..."], "gaps": ["..."]}
Scores are integers. Judge only on evidence in the resume."#;

const EVALUATION_SYSTEM_PROMPT: &str = r#"You are a hiring manager reviewing an interview transcript.
Answer with a JSON object:
{"overall_score": 0-100, "recommendation": "strong_hire|hire|no_hire|strong_no_hire",
 "strengths": ["..."], "concerns": ["..."], "summary": "short paragraph",
 "criteria": {"communication": 0-100, "technical": 0-100, "problem_solving": 0-100, "culture_fit": 0-100}}"#;

const DESCRIPTION_SYSTEM_PROMPT: &str = "You are an HR copywriter. Write an engaging, well structured job description \
    with sections for the role, responsibilities, requirements and benefits. \
    Return a JSON object with a single field 'description'.";

/// Evaluation fields before they are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDraft {
    pub overall_score: i32,
    pub recommendation: Recommendation,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub summary: String,
    pub criteria: Option<JsonValue>,
}

fn string_list(value: &JsonValue, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_array()))
        .map(|a| {
            a.iter()
                .filter_map(|x| x.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn clamp_criteria(value: Option<&JsonValue>) -> Option<JsonValue> {
    let map = value?.as_object()?;
    let clamped: serde_json::Map<String, JsonValue> = map
        .iter()
        .filter_map(|(k, v)| {
            let n = v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))?;
            Some((k.clone(), JsonValue::from(clamp_score(n))))
        })
        .collect();
    (!clamped.is_empty()).then(|| JsonValue::Object(clamped))
}

/// Reads an evaluation verdict, from the LLM or from the interview service.
/// Scores are clamped to [0,100]; a missing recommendation is derived from the score.
pub fn parse_evaluation(value: &JsonValue) -> EvaluationDraft {
    let raw_score = ["overall_score", "score", "rating"].iter().find_map(|k| match value.get(*k) {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        _ => None,
    });
    let overall_score = raw_score.map(clamp_score).unwrap_or(0);

    let recommendation = value
        .get("recommendation")
        .and_then(|v| v.as_str())
        .and_then(Recommendation::parse_lenient)
        .unwrap_or_else(|| Recommendation::from_score(overall_score));

    let summary = value
        .get("summary")
        .or_else(|| value.get("feedback"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "No summary provided.".to_string());

    EvaluationDraft {
        overall_score,
        recommendation,
        strengths: string_list(value, &["strengths"]),
        concerns: string_list(value, &["concerns", "weaknesses", "gaps"]),
        summary,
        criteria: clamp_criteria(value.get("criteria").or_else(|| value.get("scores"))),
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn fallback_job_description(payload: &GenerateJobDescriptionPayload) -> String {
    let mut out = payload.title.clone();
    if let Some(department) = payload.department.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format!(" ({})", department));
    }
    if let Some(location) = payload.location.as_deref().filter(|l| !l.is_empty()) {
        out.push_str(&format!(", {}", location));
    }
    out.push_str(".\n\nWe are looking for a professional to join our team.");
    if !payload.skills.is_empty() {
        out.push_str(&format!("\n\nRequired skills: {}.", payload.skills.join(", ")));
    }
    if let Some(notes) = payload.notes.as_deref().filter(|n| !n.is_empty()) {
        out.push_str(&format!("\n\n{}", notes));
    }
    out.push_str("\n\nApply now!");
    out
}

#[derive(Clone)]
pub struct AIService {
    llm: Option<LlmClient>,
}

impl AIService {
    pub fn new(config: &Config, client: Client) -> Self {
        let llm = match config.matcher_provider {
            MatcherProvider::OpenAi => Some(LlmClient::new(
                LlmProvider::OpenAi,
                config.openai_api_key.clone(),
                client,
            )),
            MatcherProvider::Anthropic => Some(LlmClient::new(
                LlmProvider::Anthropic,
                config.anthropic_api_key.clone(),
                client,
            )),
            MatcherProvider::Rules => None,
        };
        Self { llm }
    }

    pub fn with_client(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    pub fn uses_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Scores a resume against a job. LLM errors are returned, not papered over
    /// with the keyword scorer, so a bad key is visible to the user.
    pub async fn score_resume(&self, resume_text: &str, job: &Job) -> Result<MatchResult> {
        let Some(llm) = &self.llm else {
            return Ok(matching::rules_match(resume_text, job));
        };

        let user = serde_json::json!({
            "job": job.matching_brief(),
            "resume": truncate_chars(resume_text, MAX_RESUME_CHARS),
        })
        .to_string();
        let value = llm.complete_json(MATCH_SYSTEM_PROMPT, &user).await?;
        Ok(matching::parse_llm_match(&value))
    }

    pub async fn evaluate_transcript(
        &self,
        transcript: &str,
        job: &Job,
        candidate_name: &str,
    ) -> Result<EvaluationDraft> {
        let llm = self
            .llm
            .as_ref()
            .ok_or(LlmError::MissingApiKey("interview evaluation"))?;

        let user = serde_json::json!({
            "job": job.matching_brief(),
            "candidate": candidate_name,
            "transcript": truncate_chars(transcript, MAX_TRANSCRIPT_CHARS),
        })
        .to_string();
        let value = llm.complete_json(EVALUATION_SYSTEM_PROMPT, &user).await?;
        Ok(parse_evaluation(&value))
    }

    pub async fn generate_job_description(&self, payload: &GenerateJobDescriptionPayload) -> String {
        let Some(llm) = &self.llm else {
            return fallback_job_description(payload);
        };

        let user = serde_json::json!({
            "title": payload.title,
            "department": payload.department,
            "location": payload.location,
            "skills": payload.skills,
            "notes": payload.notes,
        })
        .to_string();
        match llm.complete_json(DESCRIPTION_SYSTEM_PROMPT, &user).await {
            Ok(resp) => {
                if let Some(desc) = resp.get("description").and_then(|v| v.as_str()) {
                    if !desc.trim().is_empty() {
                        return desc.trim().to_string();
                    }
                }
                tracing::warn!("job description response had no description field");
            }
            Err(e) => tracing::error!(error = %e, "job description generation failed"),
        }
        fallback_job_description(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluation_scores_are_clamped() {
        let draft = parse_evaluation(&json!({
            "overall_score": 140,
            "recommendation": "Strong Hire",
            "strengths": ["clear communicator", " "],
            "concerns": ["little SQL"],
            "summary": "Solid.",
            "criteria": {"technical": -5, "communication": "88", "notes": "n/a"}
        }));
        assert_eq!(draft.overall_score, 100);
        assert_eq!(draft.recommendation, Recommendation::StrongHire);
        assert_eq!(draft.strengths, vec!["clear communicator".to_string()]);
        assert_eq!(draft.criteria, Some(json!({"technical": 0, "communication": 88})));
    }

    #[test]
    fn recommendation_falls_back_to_score() {
        let draft = parse_evaluation(&json!({"score": "70", "recommendation": "maybe"}));
        assert_eq!(draft.overall_score, 70);
        assert_eq!(draft.recommendation, Recommendation::Hire);
        assert_eq!(draft.summary, "No summary provided.");
        assert!(draft.criteria.is_none());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn fallback_description_mentions_skills() {
        let payload = GenerateJobDescriptionPayload {
            title: "Backend Engineer".into(),
            department: Some("Platform".into()),
            location: None,
            skills: vec!["Rust".into(), "Postgres".into()],
            notes: None,
        };
        let text = fallback_job_description(&payload);
        assert!(text.starts_with("Backend Engineer (Platform)."));
        assert!(text.contains("Rust, Postgres"));
    }

    #[tokio::test]
    async fn rules_provider_scores_without_network() {
        let service = AIService::with_client(None);
        assert!(!service.uses_llm());
        let now = chrono::Utc::now();
        let job = Job {
            id: uuid::Uuid::new_v4(),
            title: "Rust Engineer".into(),
            department: None,
            location: "Remote".into(),
            employment_type: None,
            description: "Build services".into(),
            requirements: None,
            skills: vec!["Rust".into(), "Kubernetes".into()],
            min_experience_years: Some(3),
            salary_min: None,
            salary_max: None,
            openings: 1,
            status: "active".into(),
            created_by: None,
            published_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };
        let result = service
            .score_resume("Rust developer, 5 years, BSc in CS", &job)
            .await
            .unwrap();
        assert!((0..=100).contains(&result.score));
        assert_eq!(result.method, matching::MatchMethod::Rules);
    }

    #[tokio::test]
    async fn evaluation_without_llm_is_an_error() {
        let service = AIService::with_client(None);
        let now = chrono::Utc::now();
        let job = Job {
            id: uuid::Uuid::new_v4(),
            title: "QA".into(),
            department: None,
            location: "Remote".into(),
            employment_type: None,
            description: "Testing".into(),
            requirements: None,
            skills: vec![],
            min_experience_years: None,
            salary_min: None,
            salary_max: None,
            openings: 1,
            status: "active".into(),
            created_by: None,
            published_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };
        let err = service.evaluate_transcript("hi", &job, "Jane").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Llm(LlmError::MissingApiKey(_))));
    }
}
