//! Federated sign-in through external identity providers.
//!
//! The flow is a plain OAuth authorization-code exchange:
//!
//! 1. `GET /api/auth/signin/{provider}` stores a random `state` in a short-lived
//!    cookie and redirects to the provider.
//! 2. `GET /api/auth/callback/{provider}` checks `state`, exchanges `code` for a
//!    verified profile, and resolves it to a local account.
//!
//! Resolution is lookup-before-create keyed on email. A first-time sign-in
//! creates a verified `author` with no password. Two concurrent first-time
//! sign-ins race on the unique email index; the loser re-reads the winner's
//! row. Any persistence failure denies the sign-in.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Redirect, Response},
};
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{error, info, warn};
use url::Url;
use utoipa::{IntoParams, ToSchema};

use super::{
    error::AuthError,
    identity::{Identity, NewUser},
    session::session_cookie,
    state::{AuthConfig, AuthState},
    storage::{CreateOutcome, UserStore},
    types::ErrorResponse,
    utils::{generate_state_token, login_error_location, normalize_email, read_cookie},
};

pub const STATE_COOKIE_NAME: &str = "confgate_oauth_state";
const STATE_COOKIE_PATH: &str = "/api/auth/callback";
const STATE_TTL_SECONDS: u64 = 10 * 60;

/// Error codes appended to `/login?error=`.
pub const ERROR_OAUTH_SIGNIN: &str = "OAuthSignin";
pub const ERROR_OAUTH_CALLBACK: &str = "OAuthCallback";
pub const ERROR_ACCESS_DENIED: &str = "AccessDenied";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            other => Err(anyhow!("unsupported identity provider: {other}")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile asserted by a provider after a successful code exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederatedProfile {
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// URL the browser is sent to in order to start sign-in.
    ///
    /// # Errors
    /// Returns an error if the configured endpoint is not a valid URL.
    fn authorization_url(&self, state: &str) -> Result<String>;

    /// Trade an authorization code for the user's verified profile.
    async fn exchange_code(&self, code: &str) -> Result<FederatedProfile>;
}

/// Resolve a provider-asserted profile into a local identity.
///
/// # Errors
/// Every failure is [`AuthError::SignInFailed`]; the caller must deny access.
pub async fn resolve_federated_identity(
    store: &dyn UserStore,
    provider: Provider,
    profile: FederatedProfile,
) -> Result<Identity, AuthError> {
    let email = normalize_email(&profile.email);
    if email.is_empty() {
        return Err(AuthError::SignInFailed(anyhow!(
            "{provider} profile has no email"
        )));
    }

    if let Some(user) = store
        .find_user_by_email(&email)
        .await
        .context("failed to look up federated user")
        .map_err(AuthError::SignInFailed)?
    {
        return Ok(user.identity());
    }

    let name = profile.name.trim().to_string();
    let outcome = store
        .create_user(NewUser::federated(email.clone(), name))
        .await
        .context("failed to create federated user")
        .map_err(AuthError::SignInFailed)?;

    match outcome {
        CreateOutcome::Created(user) => {
            info!(user_id = %user.id, %provider, "Created account from federated sign-in");
            Ok(user.identity())
        }
        CreateOutcome::Conflict => store
            .find_user_by_email(&email)
            .await
            .context("failed to re-read federated user after conflict")
            .map_err(AuthError::SignInFailed)?
            .map(|user| user.identity())
            .ok_or_else(|| {
                AuthError::SignInFailed(anyhow!("user missing after unique conflict"))
            }),
    }
}

struct Endpoints {
    authorize: &'static str,
    token: &'static str,
    profile: &'static str,
    scope: &'static str,
}

const GOOGLE: Endpoints = Endpoints {
    authorize: "https://accounts.google.com/o/oauth2/v2/auth",
    token: "https://oauth2.googleapis.com/token",
    profile: "https://openidconnect.googleapis.com/v1/userinfo",
    scope: "openid email profile",
};

const GITHUB: Endpoints = Endpoints {
    authorize: "https://github.com/login/oauth/authorize",
    token: "https://github.com/login/oauth/access_token",
    profile: "https://api.github.com/user",
    scope: "read:user user:email",
};

const GITHUB_EMAILS: &str = "https://api.github.com/user/emails";

impl Provider {
    fn endpoints(self) -> &'static Endpoints {
        match self {
            Self::Google => &GOOGLE,
            Self::Github => &GITHUB,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// OAuth client for one provider, built from its client credentials.
pub struct OAuthClient {
    provider: Provider,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    http: Client,
}

impl fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl OAuthClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        provider: Provider,
        client_id: String,
        client_secret: SecretString,
        config: &AuthConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build OAuth HTTP client")?;
        Ok(Self {
            provider,
            client_id,
            client_secret,
            redirect_uri: config.redirect_uri(provider),
            http,
        })
    }

    async fn access_token(&self, code: &str) -> Result<String> {
        let endpoints = self.provider.endpoints();
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];
        let response: TokenResponse = self
            .http
            .post(endpoints.token)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .with_context(|| format!("{} token request failed", self.provider))?
            .json()
            .await
            .with_context(|| format!("{} token response was not JSON", self.provider))?;

        if let Some(error) = response.error {
            bail!(
                "{} rejected the authorization code: {error} {}",
                self.provider,
                response.error_description.unwrap_or_default()
            );
        }
        response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow!("{} returned no access token", self.provider))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        self.http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?
            .json()
            .await
            .with_context(|| format!("{url} returned an unexpected body"))
    }

    async fn google_profile(&self, token: &str) -> Result<FederatedProfile> {
        let info: GoogleUserInfo = self.get_json(GOOGLE.profile, token).await?;
        google_profile_from(info)
    }

    async fn github_profile(&self, token: &str) -> Result<FederatedProfile> {
        let user: GithubUser = self.get_json(GITHUB.profile, token).await?;
        let emails: Vec<GithubEmail> = if user.email.as_deref().is_some_and(|email| !email.is_empty()) {
            Vec::new()
        } else {
            self.get_json(GITHUB_EMAILS, token).await?
        };
        github_profile_from(user, &emails)
    }
}

fn google_profile_from(info: GoogleUserInfo) -> Result<FederatedProfile> {
    let email = info
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| anyhow!("google profile has no email"))?;
    if info.email_verified != Some(true) {
        bail!("google email is not verified");
    }
    let name = info
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
    Ok(FederatedProfile { email, name })
}

fn github_profile_from(user: GithubUser, emails: &[GithubEmail]) -> Result<FederatedProfile> {
    let email = match user.email.filter(|email| !email.is_empty()) {
        Some(email) => email,
        None => emails
            .iter()
            .find(|entry| entry.primary && entry.verified)
            .map(|entry| entry.email.clone())
            .ok_or_else(|| anyhow!("github account has no primary verified email"))?,
    };
    let name = user
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(user.login);
    Ok(FederatedProfile { email, name })
}

#[async_trait]
impl IdentityProvider for OAuthClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorization_url(&self, state: &str) -> Result<String> {
        let endpoints = self.provider.endpoints();
        let url = Url::parse_with_params(
            endpoints.authorize,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", endpoints.scope),
                ("state", state),
            ],
        )
        .with_context(|| format!("invalid {} authorization endpoint", self.provider))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<FederatedProfile> {
        let token = self.access_token(code).await?;
        match self.provider {
            Provider::Google => self.google_profile(&token).await,
            Provider::Github => self.github_profile(&token).await,
        }
    }
}

fn state_cookie(
    config: &AuthConfig,
    value: &str,
    max_age: u64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{STATE_COOKIE_NAME}={value}; Path={STATE_COOKIE_PATH}; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn enabled_provider<'a>(
    auth_state: &'a AuthState,
    name: &str,
) -> Option<&'a Arc<dyn IdentityProvider>> {
    name.parse::<Provider>()
        .ok()
        .and_then(|provider| auth_state.provider(provider))
}

#[utoipa::path(
    get,
    path = "/api/auth/signin/{provider}",
    params(
        ("provider" = String, Path, description = "Identity provider: google or github")
    ),
    responses(
        (status = 307, description = "Redirect to the identity provider"),
        (status = 404, description = "Unknown or unconfigured provider", body = ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn signin(
    Path(provider): Path<String>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let Some(client) = enabled_provider(&auth_state, &provider) else {
        return not_found("Unknown identity provider");
    };

    let state = match generate_state_token() {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to generate oauth state: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let location = match client.authorization_url(&state) {
        Ok(location) => location,
        Err(err) => {
            error!("Failed to build authorization url: {err:#}");
            return Redirect::temporary(&login_error_location(ERROR_OAUTH_SIGNIN)).into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match state_cookie(auth_state.config(), &state, STATE_TTL_SECONDS) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build state cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    (headers, Redirect::temporary(&location)).into_response()
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code issued by the provider.
    pub code: Option<String>,
    /// Anti-forgery value echoed back by the provider.
    pub state: Option<String>,
    /// Set by the provider when the user declined or the request failed.
    pub error: Option<String>,
}

/// Redirect back to the login page and drop the state cookie.
fn fail(config: &AuthConfig, code: &str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = state_cookie(config, "", 0) {
        headers.insert(SET_COOKIE, cookie);
    }
    (headers, Redirect::temporary(&login_error_location(code))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/callback/{provider}",
    params(
        ("provider" = String, Path, description = "Identity provider: google or github"),
        CallbackParams
    ),
    responses(
        (status = 307, description = "Signed in and redirected home, or redirected to /login?error=<code>")
    ),
    tag = "auth"
)]
pub async fn callback(
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let config = auth_state.config();

    let Some(client) = enabled_provider(&auth_state, &provider) else {
        warn!(provider = %provider, "Callback for unknown identity provider");
        return fail(config, ERROR_OAUTH_SIGNIN);
    };
    let provider = client.provider();

    if let Some(error) = params.error.as_deref() {
        warn!(%provider, error, "Identity provider returned an error");
        return fail(config, ERROR_OAUTH_CALLBACK);
    }

    let expected_state = read_cookie(&headers, STATE_COOKIE_NAME);
    let state_matches = matches!(
        (expected_state.as_deref(), params.state.as_deref()),
        (Some(expected), Some(received)) if expected == received
    );
    if !state_matches {
        warn!(%provider, "OAuth state mismatch");
        return fail(config, ERROR_OAUTH_CALLBACK);
    }

    let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) else {
        warn!(%provider, "Callback without authorization code");
        return fail(config, ERROR_OAUTH_CALLBACK);
    };

    let profile = match client.exchange_code(code).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!(%provider, "Code exchange failed: {err:#}");
            return fail(config, ERROR_OAUTH_CALLBACK);
        }
    };

    let identity = match resolve_federated_identity(auth_state.store(), provider, profile).await {
        Ok(identity) => identity,
        Err(err) => {
            error!(%provider, kind = err.kind(), "Federated sign-in denied: {err:#}");
            return fail(config, ERROR_ACCESS_DENIED);
        }
    };

    let sessions = auth_state.sessions();
    let cookie = match sessions
        .mint(&identity)
        .and_then(|token| session_cookie(config, sessions, &token).map_err(anyhow::Error::from))
    {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to issue session: {err:#}");
            return fail(config, ERROR_OAUTH_CALLBACK);
        }
    };

    let mut response_headers = HeaderMap::new();
    response_headers.append(SET_COOKIE, cookie);
    if let Ok(clear) = state_cookie(config, "", 0) {
        response_headers.append(SET_COOKIE, clear);
    }

    info!(user_id = %identity.id, %provider, role = %identity.role, "Federated sign-in succeeded");
    (response_headers, Redirect::temporary("/")).into_response()
}
