use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScreeningToken {
    pub id: Uuid,
    pub token: String,
    pub application_id: Uuid,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScreeningToken {
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }

    pub fn purpose(&self) -> Option<ScreeningPurpose> {
        self.purpose.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningPurpose {
    Schedule,
    AiScreening,
}

impl ScreeningPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningPurpose::Schedule => "schedule",
            ScreeningPurpose::AiScreening => "ai_screening",
        }
    }
}

impl std::str::FromStr for ScreeningPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(ScreeningPurpose::Schedule),
            "ai_screening" => Ok(ScreeningPurpose::AiScreening),
            other => Err(format!("unknown screening purpose '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration, used: bool) -> ScreeningToken {
        let now = Utc::now();
        ScreeningToken {
            id: Uuid::new_v4(),
            token: "t".into(),
            application_id: Uuid::new_v4(),
            purpose: "schedule".into(),
            expires_at: now + expires_in,
            used_at: used.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn usable_only_when_unused_and_unexpired() {
        let now = Utc::now();
        assert!(token(Duration::hours(1), false).is_usable_at(now));
        assert!(!token(Duration::hours(1), true).is_usable_at(now));
        assert!(!token(Duration::hours(-1), false).is_usable_at(now));
    }
}
