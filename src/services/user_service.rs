use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::auth_dto::{CreateUserPayload, LoginPayload, LoginResponse};
use crate::error::{Error, Result};
use crate::middleware::auth::issue_token;
use crate::models::user::User;
use crate::utils::crypto::{hash_password, verify_password};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

fn hash(plain: &str) -> Result<String> {
    hash_password(plain).map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn login(&self, payload: LoginPayload, jwt_secret: &str) -> Result<LoginResponse> {
        let invalid = || Error::Unauthorized("Invalid email or password".to_string());
        let user = self.find_by_email(&payload.email).await?.ok_or_else(invalid)?;
        if !user.is_active {
            return Err(invalid());
        }
        let matches = verify_password(&payload.password, &user.password_hash).unwrap_or_else(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "stored password hash is unreadable");
            false
        });
        if !matches {
            return Err(invalid());
        }

        let (token, expires_at) = issue_token(jwt_secret, user.id, &user.role)?;
        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_at,
            user,
        })
    }

    pub async fn create(&self, payload: CreateUserPayload) -> Result<User> {
        if self.find_by_email(&payload.email).await?.is_some() {
            return Err(Error::Conflict("A user with this email already exists".to_string()));
        }
        let query = format!(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(payload.email.trim().to_lowercase())
            .bind(payload.name.trim())
            .bind(hash(&payload.password)?)
            .bind(&payload.role)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query).fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Creates the bootstrap admin when no user with that email exists yet.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(false);
        }
        let query = "INSERT INTO users (email, name, password_hash, role) VALUES ($1, $2, $3, 'admin') ON CONFLICT (email) DO NOTHING";
        let inserted = sqlx::query(query)
            .bind(email.trim().to_lowercase())
            .bind("Administrator")
            .bind(hash(password)?)
            .execute(&self.pool)
            .await?;
        Ok(inserted.rows_affected() > 0)
    }
}
