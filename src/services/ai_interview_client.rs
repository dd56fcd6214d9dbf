use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub reference_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_title: String,
    pub job_description: String,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSession {
    #[serde(alias = "session_id")]
    pub id: String,
    #[serde(default, alias = "url", alias = "join_url")]
    pub session_url: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub transcript: Option<JsonValue>,
    #[serde(default)]
    pub evaluation: Option<JsonValue>,
}

impl AiSession {
    pub fn is_completed(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "completed" | "complete" | "finished" | "ended"
        )
    }

    /// Transcript as plain text; the service may send a string or a list of turns.
    pub fn transcript_text(&self) -> Option<String> {
        match self.transcript.as_ref()? {
            JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            JsonValue::Array(turns) => {
                let lines: Vec<String> = turns
                    .iter()
                    .filter_map(|turn| {
                        let text = turn
                            .get("text")
                            .or_else(|| turn.get("content"))
                            .and_then(|v| v.as_str())?;
                        let speaker = turn
                            .get("speaker")
                            .or_else(|| turn.get("role"))
                            .and_then(|v| v.as_str())
                            .unwrap_or("unknown");
                        Some(format!("{}: {}", speaker, text.trim()))
                    })
                    .collect();
                (!lines.is_empty()).then(|| lines.join("\n"))
            }
            _ => None,
        }
    }
}

/// Client for the hosted AI interview service.
#[derive(Clone)]
pub struct AiInterviewClient {
    client: Client,
    base_url: Option<Url>,
    api_key: Option<String>,
}

impl AiInterviewClient {
    pub fn new(base_url: Option<&str>, api_key: Option<String>, client: Client) -> Self {
        let base_url = base_url.and_then(|raw| {
            let with_slash = if raw.ends_with('/') { raw.to_string() } else { format!("{}/", raw) };
            match Url::parse(&with_slash) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(error = %e, "AI_INTERVIEW_API_URL is not a valid URL; AI sessions disabled");
                    None
                }
            }
        });
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_ref().ok_or_else(|| {
            Error::Upstream("AI interview service is not configured".to_string())
        })?;
        base.join(path)
            .map_err(|e| Error::Internal(format!("invalid AI interview URL: {}", e)))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    pub async fn create_session(&self, request: &CreateSessionRequest) -> Result<AiSession> {
        let url = self.endpoint("sessions")?;
        let res = self.authorized(self.client.post(url)).json(request).send().await?;
        Self::read_session(res).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<AiSession> {
        let url = self.endpoint(&format!("sessions/{}", urlencode(session_id)))?;
        let res = self.authorized(self.client.get(url)).send().await?;
        Self::read_session(res).await
    }

    async fn read_session(res: reqwest::Response) -> Result<AiSession> {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "AI interview service error");
            return Err(Error::Upstream(format!(
                "AI interview service returned {}",
                status.as_u16()
            )));
        }
        let session = res.json::<AiSession>().await?;
        Ok(session)
    }
}

fn urlencode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_join_onto_base_path() {
        let client = AiInterviewClient::new(Some("https://interviews.example.com/api/v1"), None, Client::new());
        assert!(client.is_enabled());
        assert_eq!(
            client.endpoint("sessions").unwrap().as_str(),
            "https://interviews.example.com/api/v1/sessions"
        );
    }

    #[test]
    fn unconfigured_client_is_disabled() {
        let client = AiInterviewClient::new(None, None, Client::new());
        assert!(!client.is_enabled());
        assert!(matches!(client.endpoint("sessions"), Err(Error::Upstream(_))));
    }

    #[test]
    fn transcript_turns_are_flattened() {
        let session: AiSession = serde_json::from_value(json!({
            "session_id": "s-1",
            "url": "https://interviews.example.com/s-1",
            "status": "Completed",
            "transcript": [
                {"role": "interviewer", "content": "Tell me about Rust."},
                {"speaker": "candidate", "text": " Ownership first. "}
            ]
        }))
        .unwrap();
        assert_eq!(session.id, "s-1");
        assert!(session.is_completed());
        assert_eq!(
            session.transcript_text().as_deref(),
            Some("interviewer: Tell me about Rust.\ncandidate: Ownership first.")
        );
    }
}
