//! Authentication error taxonomy and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use super::types::ErrorResponse;

/// Message shown to end users for every credential failure.
pub const AUTHENTICATION_FAILED: &str = "authentication failed";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error("account has no password, sign in with the provider used to register")]
    NoPasswordSet,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("federated sign-in failed")]
    SignInFailed(#[source] anyhow::Error),
    #[error("invalid session token")]
    InvalidToken,
    #[error("storage failure")]
    Storage(#[source] anyhow::Error),
}

impl AuthError {
    /// Stable label for logs; never sent to clients.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::UserNotFound => "user_not_found",
            Self::NoPasswordSet => "no_password_set",
            Self::InvalidCredentials => "invalid_credentials",
            Self::SignInFailed(_) => "sign_in_failed",
            Self::InvalidToken => "invalid_token",
            Self::Storage(_) => "storage",
        }
    }

    /// Credential-path failures collapse into one outcome for the client.
    #[must_use]
    pub const fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::UserNotFound
                | Self::NoPasswordSet
                | Self::InvalidCredentials
        )
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials
            | Self::UserNotFound
            | Self::NoPasswordSet
            | Self::InvalidCredentials
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::SignInFailed(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::SignInFailed(_) => "sign-in denied",
            Self::Storage(_) => "internal server error",
            _ => AUTHENTICATION_FAILED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Storage(err) = &self {
            error!("Auth storage failure: {err:#}");
        }
        let body = ErrorResponse {
            error: self.public_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use http_body_util::BodyExt;

    #[test]
    fn credential_kinds_share_status() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::UserNotFound,
            AuthError::NoPasswordSet,
            AuthError::InvalidCredentials,
        ] {
            assert!(err.is_credential_failure());
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.public_message(), AUTHENTICATION_FAILED);
        }
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            AuthError::MissingCredentials.kind(),
            AuthError::UserNotFound.kind(),
            AuthError::NoPasswordSet.kind(),
            AuthError::InvalidCredentials.kind(),
            AuthError::SignInFailed(anyhow!("boom")).kind(),
            AuthError::InvalidToken.kind(),
            AuthError::Storage(anyhow!("boom")).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn sign_in_failed_keeps_source() {
        let err = AuthError::SignInFailed(anyhow!("unique index missing"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("unique index missing"));
        assert!(!err.is_credential_failure());
    }

    #[tokio::test]
    async fn response_body_hides_failure_kind() -> anyhow::Result<()> {
        let response = AuthError::NoPasswordSet.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = response.into_body().collect().await?.to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["error"], AUTHENTICATION_FAILED);
        Ok(())
    }
}
