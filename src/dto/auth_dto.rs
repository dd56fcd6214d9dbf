use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::user::{User, ROLES};

fn validate_role(value: &str) -> Result<(), ValidationError> {
    if ROLES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_role"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: usize,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default = "default_role")]
    #[validate(custom(function = "validate_role"))]
    pub role: String,
}

fn default_role() -> String {
    "recruiter".to_string()
}
