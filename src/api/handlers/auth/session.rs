//! Signed session tokens and the session endpoints.
//!
//! A session is a stateless HS256 JWT carried in the `confgate_session`
//! cookie (or an `Authorization: Bearer` header). Its claims are a snapshot
//! of the identity at sign-in; nothing re-reads the user record while the
//! token is valid.

use anyhow::{Context, Result, bail};
use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::debug;
use uuid::Uuid;

use super::{
    error::AuthError,
    identity::{Identity, Role},
    state::{AuthConfig, AuthState},
    types::SessionResponse,
    utils::read_cookie,
};

pub const SESSION_COOKIE_NAME: &str = "confgate_session";

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Mints and verifies session tokens with a server-held secret.
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl SessionIssuer {
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LENGTH`] bytes.
    pub fn new(secret: &SecretString, ttl_seconds: u64) -> Result<Self> {
        let bytes = secret.expose_secret().as_bytes();
        if bytes.len() < MIN_SECRET_LENGTH {
            bail!("session secret must be at least {MIN_SECRET_LENGTH} bytes");
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            ttl_seconds,
        })
    }

    /// Token lifetime; the session cookie's `Max-Age` uses the same value.
    #[must_use]
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Mint a token for `identity`, valid from now for the configured TTL.
    ///
    /// # Errors
    /// Returns an error if the clock is before the epoch or signing fails.
    pub fn mint(&self, identity: &Identity) -> Result<String> {
        self.mint_at(identity, unix_now()?)
    }

    /// Mint a token as if issued at `now` (seconds since the epoch).
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint_at(&self, identity: &Identity, now: u64) -> Result<String> {
        let claims = SessionClaims {
            id: identity.id,
            email: identity.email.clone(),
            name: identity.name.clone(),
            role: identity.role,
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("failed to sign session token")
    }

    /// Check signature and expiry and return the embedded claims.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] for any malformed, tampered, or expired token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!("Rejected session token: {err}");
                AuthError::InvalidToken
            })
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs())
}

/// Resolve the request's session into verified claims, if any.
///
/// Missing, malformed, and expired tokens all resolve to `None`.
#[must_use]
pub fn authenticate(headers: &HeaderMap, state: &AuthState) -> Option<SessionClaims> {
    let token = extract_session_token(headers)?;
    state.sessions().verify(&token).ok()
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match authenticate(&headers, &auth_state) {
        Some(claims) => (StatusCode::OK, Json(SessionResponse::from(claims))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Tokens are stateless; clearing the cookie is all logout can do.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build a `HttpOnly` cookie for a token minted by `sessions`.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    sessions: &SessionIssuer,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = sessions.ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| read_cookie(headers, SESSION_COOKIE_NAME))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn issuer(ttl_seconds: u64) -> Result<SessionIssuer> {
        SessionIssuer::new(&SecretString::from(SECRET.to_string()), ttl_seconds)
    }

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Role::Reviewer,
        }
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(SessionIssuer::new(&SecretString::from("too-short".to_string()), 60).is_err());
    }

    #[test]
    fn minted_token_verifies_to_same_identity() -> Result<()> {
        let issuer = issuer(3600)?;
        let identity = identity();
        let token = issuer.mint(&identity)?;
        let claims = issuer.verify(&token)?;
        assert_eq!(claims.id, identity.id);
        assert_eq!(claims.email, identity.email);
        assert_eq!(claims.name, identity.name);
        assert_eq!(claims.role, identity.role);
        assert_eq!(claims.exp - claims.iat, 3600);
        Ok(())
    }

    #[test]
    fn expired_token_is_invalid() -> Result<()> {
        let issuer = issuer(60)?;
        let issued_at = unix_now()? - 3600;
        let token = issuer.mint_at(&identity(), issued_at)?;
        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn token_from_other_secret_is_invalid() -> Result<()> {
        let other = SessionIssuer::new(
            &SecretString::from("ffffffffffffffffffffffffffffffff".to_string()),
            60,
        )?;
        let token = other.mint(&identity())?;
        assert!(matches!(issuer(60)?.verify(&token), Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn tampered_token_is_invalid() -> Result<()> {
        let issuer = issuer(60)?;
        let mut token = issuer.mint(&identity())?;
        token.push('x');
        assert!(issuer.verify(&token).is_err());
        assert!(issuer.verify("not.a.jwt").is_err());
        assert!(issuer.verify("").is_err());
        Ok(())
    }

    #[test]
    fn issuer_debug_hides_secret() -> Result<()> {
        let rendered = format!("{:?}", issuer(60)?);
        assert!(!rendered.contains(SECRET));
        Ok(())
    }

    #[test]
    fn session_cookie_flags() -> Result<()> {
        let sessions = issuer(3600)?;
        let plain = AuthConfig::new("http://localhost:8080".to_string());
        let cookie = session_cookie(&plain, &sessions, "tok")?;
        let value = cookie.to_str()?;
        assert!(value.starts_with("confgate_session=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(!value.contains("Secure"));

        let secure = AuthConfig::new("https://portal.example.org".to_string());
        assert!(
            session_cookie(&secure, &sessions, "tok")?
                .to_str()?
                .ends_with("; Secure")
        );
        Ok(())
    }

    #[test]
    fn cookie_max_age_matches_token_lifetime() -> Result<()> {
        let sessions = issuer(900)?;
        let token = sessions.mint(&identity())?;
        let claims = sessions.verify(&token)?;

        let cookie = session_cookie(&AuthConfig::default(), &sessions, &token)?;
        let expected = format!("Max-Age={}", claims.exp - claims.iat);
        assert!(cookie.to_str()?.contains(&expected));
        Ok(())
    }

    #[test]
    fn clear_cookie_expires_immediately() -> Result<()> {
        let cookie = clear_session_cookie(&AuthConfig::default())?;
        assert!(cookie.to_str()?.contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn bearer_token_takes_precedence_over_cookie() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("confgate_session=from-cookie"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-header"));

        headers.remove(AUTHORIZATION);
        assert_eq!(extract_session_token(&headers).as_deref(), Some("from-cookie"));
        Ok(())
    }

    #[test]
    fn empty_bearer_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
