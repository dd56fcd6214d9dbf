use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::job::Job;

pub const SKILLS_WEIGHT: f64 = 0.5;
pub const EXPERIENCE_WEIGHT: f64 = 0.3;
pub const EDUCATION_WEIGHT: f64 = 0.2;

const MAX_DERIVED_KEYWORDS: usize = 25;

const STOPWORDS: &[&str] = &[
    "and", "the", "for", "with", "you", "our", "are", "will", "have", "has", "who", "that",
    "this", "from", "your", "not", "but", "all", "any", "can", "able", "must", "should",
    "years", "year", "experience", "strong", "good", "work", "working", "team", "plus",
    "knowledge", "skills", "understanding", "ability", "etc", "including", "required",
    "preferred", "least", "using", "well", "into", "their", "them", "they", "also", "such",
];

const EDUCATION_LEVELS: &[(&str, i32)] = &[
    ("phd", 100),
    ("ph.d", 100),
    ("doctorate", 100),
    ("master", 95),
    ("m.sc", 95),
    ("msc", 95),
    ("m.tech", 95),
    ("mba", 95),
    ("bachelor", 85),
    ("b.sc", 85),
    ("bsc", 85),
    ("b.tech", 85),
    ("b.e.", 85),
    ("degree", 80),
    ("university", 75),
    ("diploma", 60),
    ("certificate", 50),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Llm,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: i32,
    pub skills_score: i32,
    pub experience_score: i32,
    pub education_score: i32,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    pub method: MatchMethod,
}

impl MatchResult {
    pub fn details(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

pub fn clamp_score(raw: f64) -> i32 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as i32
}

pub fn weighted_score(skills: i32, experience: i32, education: i32) -> i32 {
    clamp_score(
        skills as f64 * SKILLS_WEIGHT
            + experience as f64 * EXPERIENCE_WEIGHT
            + education as f64 * EDUCATION_WEIGHT,
    )
}

fn number_field(value: &JsonValue, key: &str) -> Option<f64> {
    match value.get(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

fn string_list(value: &JsonValue, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|x| x.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Reads the model's JSON verdict; every score is clamped to [0,100].
pub fn parse_llm_match(value: &JsonValue) -> MatchResult {
    let skills = number_field(value, "skills_score").map(clamp_score);
    let experience = number_field(value, "experience_score").map(clamp_score);
    let education = number_field(value, "education_score").map(clamp_score);

    let score = match number_field(value, "score").or_else(|| number_field(value, "rating")) {
        Some(raw) => clamp_score(raw),
        None => weighted_score(
            skills.unwrap_or(0),
            experience.unwrap_or(0),
            education.unwrap_or(0),
        ),
    };

    let summary = value
        .get("summary")
        .or_else(|| value.get("comment"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "No summary provided.".to_string());

    MatchResult {
        score,
        skills_score: skills.unwrap_or(score),
        experience_score: experience.unwrap_or(score),
        education_score: education.unwrap_or(score),
        summary,
        strengths: string_list(value, "strengths"),
        gaps: string_list(value, "gaps"),
        method: MatchMethod::Llm,
    }
}

fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric();
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.map(is_word).unwrap_or(false) && !after.map(is_word).unwrap_or(false)
    })
}

/// Skill terms for a job: its explicit skills, or keywords pulled from the requirements.
pub fn job_keywords(job: &Job) -> Vec<String> {
    if !job.skills.is_empty() {
        return job
            .skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
    }

    let source = job.requirements.as_deref().unwrap_or(&job.description).to_lowercase();
    let mut seen = BTreeSet::new();
    source
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| t.chars().count() >= 3 && !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !STOPWORDS.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .take(MAX_DERIVED_KEYWORDS)
        .map(str::to_string)
        .collect()
}

pub fn years_of_experience(text: &str) -> Option<i32> {
    static YEARS: OnceLock<Regex> = OnceLock::new();
    let re = YEARS.get_or_init(|| Regex::new(r"(?i)(\d{1,2})\s*\+?\s*(?:years|yrs|year)").unwrap());
    re.captures_iter(text)
        .filter_map(|c| c[1].parse::<i32>().ok())
        .filter(|y| *y <= 50)
        .max()
}

/// Weighted keyword overlap used when no LLM provider is configured.
pub fn rules_match(resume_text: &str, job: &Job) -> MatchResult {
    let resume = resume_text.to_lowercase();

    let keywords = job_keywords(job);
    let (matched, missing): (Vec<String>, Vec<String>) =
        keywords.into_iter().partition(|k| contains_term(&resume, k));
    let total = matched.len() + missing.len();
    let skills_score = if total == 0 {
        50
    } else {
        clamp_score(matched.len() as f64 * 100.0 / total as f64)
    };

    let found_years = years_of_experience(resume_text);
    let experience_score = match (job.min_experience_years, found_years) {
        (None, Some(_)) | (Some(0), _) => 100,
        (None, None) => 60,
        (Some(required), Some(years)) => clamp_score(years as f64 * 100.0 / required as f64),
        (Some(_), None) => 20,
    };

    let education_score = EDUCATION_LEVELS
        .iter()
        .filter(|(term, _)| contains_term(&resume, term))
        .map(|(_, level)| *level)
        .max()
        .unwrap_or(30);

    let score = weighted_score(skills_score, experience_score, education_score);

    let mut gaps: Vec<String> = missing.iter().take(10).map(|k| format!("No mention of {}", k)).collect();
    if let (Some(required), years) = (job.min_experience_years, found_years) {
        if years.unwrap_or(0) < required {
            gaps.push(format!("Requires {} years of experience", required));
        }
    }

    MatchResult {
        score,
        skills_score,
        experience_score,
        education_score,
        summary: format!(
            "Keyword screening: {}/{} job skills found in the resume.",
            matched.len(),
            total
        ),
        strengths: matched.into_iter().take(10).collect(),
        gaps,
        method: MatchMethod::Rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job(skills: &[&str], requirements: Option<&str>, min_years: Option<i32>) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            department: None,
            location: "Remote".into(),
            employment_type: None,
            description: "Build services".into(),
            requirements: requirements.map(str::to_string),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            min_experience_years: min_years,
            salary_min: None,
            salary_max: None,
            openings: 1,
            status: "active".into(),
            created_by: None,
            published_at: None,
            closed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn clamps_out_of_range_scores() {
        assert_eq!(clamp_score(-12.0), 0);
        assert_eq!(clamp_score(142.6), 100);
        assert_eq!(clamp_score(67.5), 68);
        assert_eq!(clamp_score(f64::NAN), 0);
    }

    #[test]
    fn llm_scores_are_clamped() {
        let v = serde_json::json!({
            "score": 250,
            "skills_score": -5,
            "experience_score": "80%",
            "summary": "  Solid  ",
            "strengths": ["rust", ""],
        });
        let m = parse_llm_match(&v);
        assert_eq!(m.score, 100);
        assert_eq!(m.skills_score, 0);
        assert_eq!(m.experience_score, 80);
        assert_eq!(m.education_score, 100);
        assert_eq!(m.summary, "Solid");
        assert_eq!(m.strengths, vec!["rust".to_string()]);
    }

    #[test]
    fn llm_score_falls_back_to_weighted_components() {
        let v = serde_json::json!({
            "skills_score": 80, "experience_score": 50, "education_score": 100
        });
        assert_eq!(parse_llm_match(&v).score, 75);
    }

    #[test]
    fn term_matching_respects_word_boundaries() {
        assert!(contains_term("i write go and rust", "go"));
        assert!(!contains_term("i love google", "go"));
        assert!(contains_term("c++ and node.js", "c++"));
        assert!(contains_term("c++ and node.js", "node.js"));
    }

    #[test]
    fn rules_match_weights_components() {
        let j = job(&["Rust", "PostgreSQL", "Kubernetes", "Kafka"], None, Some(4));
        let resume = "Jane Doe. 6 years of experience with Rust and PostgreSQL. BSc in CS.";
        let m = rules_match(resume, &j);
        assert_eq!(m.skills_score, 50);
        assert_eq!(m.experience_score, 100);
        assert_eq!(m.education_score, 85);
        assert_eq!(m.score, 72);
        assert_eq!(m.method, MatchMethod::Rules);
        assert!(m.gaps.iter().any(|g| g.contains("kafka")));
    }

    #[test]
    fn rules_match_always_within_bounds() {
        let j = job(&[], Some("Python, Django, AWS and Docker"), Some(10));
        for resume in ["", "python django aws docker 40 years phd", "nothing relevant"] {
            let m = rules_match(resume, &j);
            for s in [m.score, m.skills_score, m.experience_score, m.education_score] {
                assert!((0..=100).contains(&s));
            }
        }
    }

    #[test]
    fn derives_keywords_from_requirements() {
        let j = job(&[], Some("Experience with Python and Django; AWS a plus."), None);
        assert_eq!(job_keywords(&j), vec!["python", "django", "aws"]);
    }

    #[test]
    fn finds_largest_plausible_years() {
        assert_eq!(years_of_experience("3 years at A, 5+ years overall"), Some(5));
        assert_eq!(years_of_experience("founded 1999"), None);
    }
}
