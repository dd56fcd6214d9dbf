use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherProvider {
    OpenAi,
    Anthropic,
    Rules,
}

impl std::str::FromStr for MatcherProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "rules" | "fallback" => Ok(Self::Rules),
            other => Err(format!("unknown matcher provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub webhook_secret: String,
    pub api_rps: u32,
    pub public_rps: u32,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub matcher_provider: MatcherProvider,
    pub ai_interview_api_url: Option<String>,
    pub ai_interview_api_key: Option<String>,
    pub smtp: Option<SmtpSettings>,
    pub email_from: String,
    pub webapp_url: String,
    pub uploads_dir: String,
    pub screening_token_ttl_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub log_json: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let openai_api_key = get_env_opt("OPENAI_API_KEY");
        let anthropic_api_key = get_env_opt("ANTHROPIC_API_KEY");
        let matcher_provider = match get_env_opt("MATCHER_PROVIDER") {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("Invalid value for MATCHER_PROVIDER: {}", e)))?,
            None if openai_api_key.is_some() => MatcherProvider::OpenAi,
            None if anthropic_api_key.is_some() => MatcherProvider::Anthropic,
            None => MatcherProvider::Rules,
        };

        let smtp = match get_env_opt("SMTP_USERNAME") {
            Some(username) => Some(SmtpSettings {
                host: get_env_opt("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port: get_env_parse_or("SMTP_PORT", 587)?,
                password: get_env("SMTP_PASSWORD")?,
                username,
            }),
            None => None,
        };
        let email_from = get_env_opt("EMAIL_FROM")
            .or_else(|| smtp.as_ref().map(|s| s.username.clone()))
            .unwrap_or_else(|| "no-reply@talentdesk.local".to_string());

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            webhook_secret: get_env("WEBHOOK_SECRET")?,
            api_rps: get_env_parse_or("API_RPS", 50)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 20)?,
            openai_api_key,
            anthropic_api_key,
            matcher_provider,
            ai_interview_api_url: get_env_opt("AI_INTERVIEW_API_URL"),
            ai_interview_api_key: get_env_opt("AI_INTERVIEW_API_KEY"),
            smtp,
            email_from,
            webapp_url: get_env_opt("WEBAPP_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            uploads_dir: get_env_opt("UPLOADS_DIR").unwrap_or_else(|| "./uploads".to_string()),
            screening_token_ttl_hours: get_env_parse_or("SCREENING_TOKEN_TTL_HOURS", 72)?,
            admin_email: get_env_opt("ADMIN_EMAIL"),
            admin_password: get_env_opt("ADMIN_PASSWORD"),
            log_json: get_env_opt("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matcher_provider_parses_aliases() {
        assert_eq!("OpenAI".parse::<MatcherProvider>(), Ok(MatcherProvider::OpenAi));
        assert_eq!("claude".parse::<MatcherProvider>(), Ok(MatcherProvider::Anthropic));
        assert_eq!(" rules ".parse::<MatcherProvider>(), Ok(MatcherProvider::Rules));
        assert!("gemini".parse::<MatcherProvider>().is_err());
    }
}
