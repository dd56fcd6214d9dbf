use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured for {0}")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response was not valid JSON: {0}")]
    Parse(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::Anthropic => "Anthropic",
        }
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Chat client that always asks for, and returns, a JSON object.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    provider: LlmProvider,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(provider: LlmProvider, api_key: Option<String>, client: Client) -> Self {
        Self {
            client,
            provider,
            api_key,
        }
    }

    pub async fn complete_json(&self, system: &str, user: &str) -> Result<JsonValue, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey(self.provider.name()))?;
        let text = match self.provider {
            LlmProvider::OpenAi => self.call_openai(api_key, system, user).await?,
            LlmProvider::Anthropic => self.call_anthropic(api_key, system, user).await?,
        };
        parse_json_content(&text)
    }

    async fn call_openai(&self, api_key: &str, system: &str, user: &str) -> Result<String, LlmError> {
        let payload = serde_json::json!({
            "model": OPENAI_MODEL,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.2
        });

        let res = self
            .client
            .post(OPENAI_URL)
            .bearer_auth(api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    async fn call_anthropic(
        &self,
        api_key: &str,
        system: &str,
        user: &str,
    ) -> Result<String, LlmError> {
        let payload = serde_json::json!({
            "model": ANTHROPIC_MODEL,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": [{"role": "user", "content": user}]
        });

        let res = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: AnthropicResponse = res.json().await?;
        body.content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Accepts bare JSON or JSON wrapped in prose / markdown fences.
pub fn parse_json_content(text: &str) -> Result<JsonValue, LlmError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        return Ok(value);
    }
    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(LlmError::Parse(truncate(trimmed, 200)));
    };
    if end <= start {
        return Err(LlmError::Parse(truncate(trimmed, 200)));
    }
    serde_json::from_str(&trimmed[start..=end]).map_err(|e| LlmError::Parse(e.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"score\": 72}\n```";
        let v = parse_json_content(text).unwrap();
        assert_eq!(v["score"], 72);
    }

    #[test]
    fn rejects_prose() {
        assert!(matches!(parse_json_content("I cannot help"), Err(LlmError::Parse(_))));
        assert!(matches!(parse_json_content("   "), Err(LlmError::EmptyContent)));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = LlmClient::new(LlmProvider::Anthropic, None, Client::new());
        let err = client.complete_json("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey("Anthropic")));
    }
}
