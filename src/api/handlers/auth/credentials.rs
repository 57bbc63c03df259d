//! Email and password sign-in and sign-up.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    error::AuthError,
    identity::{Identity, NewUser},
    password::{MIN_PASSWORD_LENGTH, hash_password, verify_dummy, verify_password},
    session::session_cookie,
    state::AuthState,
    storage::{CreateOutcome, UserStore},
    types::{ErrorResponse, LoginRequest, RegisterRequest, UserResponse},
    utils::{normalize_email, valid_email},
};

/// Verify an email/password pair against the stored user record.
///
/// Read-only: a failed attempt leaves no trace beyond the returned error.
///
/// # Errors
/// Returns the specific [`AuthError`] kind; callers decide how much of it to expose.
pub async fn authorize(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let Some(user) = store
        .find_user_by_email(&email)
        .await
        .map_err(AuthError::Storage)?
    else {
        verify_dummy(password);
        return Err(AuthError::UserNotFound);
    };

    let Some(stored_hash) = user.password_hash.as_deref().filter(|hash| !hash.is_empty()) else {
        verify_dummy(password);
        return Err(AuthError::NoPasswordSet);
    };

    if verify_password(password, stored_hash).map_err(AuthError::Storage)? {
        Ok(user.identity())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

fn user_response(identity: Identity) -> UserResponse {
    UserResponse {
        id: identity.id,
        email: identity.email,
        name: identity.name,
        role: identity.role,
    }
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = UserResponse),
        (status = 400, description = "Missing payload", body = ErrorResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let identity = match authorize(auth_state.store(), &request.email, &request.password).await {
        Ok(identity) => identity,
        Err(err) => {
            if err.is_credential_failure() {
                warn!(kind = err.kind(), "Credential sign-in rejected");
            }
            return err.into_response();
        }
    };

    let token = match auth_state.sessions().mint(&identity) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to mint session token: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(auth_state.config(), auth_state.sessions(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    info!(user_id = %identity.id, role = %identity.role, "Credential sign-in succeeded");
    (StatusCode::OK, headers, Json(user_response(identity))).into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return bad_request("Invalid name");
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return bad_request("Invalid email");
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return bad_request("Password too short");
    }

    match auth_state.store().find_user_by_email(&email).await {
        Ok(Some(_)) => return conflict(),
        Ok(None) => {}
        Err(err) => return AuthError::Storage(err).into_response(),
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match auth_state
        .store()
        .create_user(NewUser::with_password(email, name, password_hash))
        .await
    {
        Ok(CreateOutcome::Created(user)) => {
            info!(user_id = %user.id, "Account registered");
            (StatusCode::CREATED, Json(user_response(user.identity()))).into_response()
        }
        Ok(CreateOutcome::Conflict) => conflict(),
        Err(err) => AuthError::Storage(err).into_response(),
    }
}

fn conflict() -> axum::response::Response {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: "Email already registered".to_string(),
        }),
    )
        .into_response()
}
