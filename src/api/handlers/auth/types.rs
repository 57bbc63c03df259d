//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{identity::Role, session::SessionClaims};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SessionResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub expires_at: u64,
}

impl From<SessionClaims> for SessionResponse {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            expires_at: claims.exp,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_debug_hides_password() {
        let request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        let rendered = format!("{request:?}");
        assert!(rendered.contains("alice@example.com"));
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn session_response_serializes_role_lowercase() -> Result<()> {
        let response = SessionResponse {
            id: Uuid::nil(),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            role: Role::Reviewer,
            expires_at: 42,
        };
        let value = serde_json::to_value(&response)?;
        let role = value
            .get("role")
            .and_then(serde_json::Value::as_str)
            .context("missing role")?;
        assert_eq!(role, "reviewer");
        Ok(())
    }
}
