use anyhow::Result;
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod guard;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::auth::{self, AuthState, types::ErrorResponse};
use handlers::health;

/// Build the application router.
///
/// `pages` holds the embedding application's page routes. They sit behind the
/// route guard together with a JSON 404 fallback; the auth API and `/health`
/// are mounted alongside and are exempt from the guard.
#[must_use]
pub fn app(pages: Router, auth_state: Arc<AuthState>) -> Router {
    let api = Router::new()
        .route("/api/auth/login", post(auth::credentials::login))
        .route("/api/auth/register", post(auth::credentials::register))
        .route("/api/auth/session", get(auth::session::session))
        .route("/api/auth/logout", post(auth::session::logout))
        .route("/api/auth/signin/:provider", get(auth::federated::signin))
        .route("/api/auth/callback/:provider", get(auth::federated::callback))
        .route("/health", get(health::health).options(health::health));

    pages
        .merge(api)
        .fallback(not_found)
        .layer(middleware::from_fn(guard::enforce))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, auth_state: Arc<AuthState>) -> Result<()> {
    let app = app(Router::new(), auth_state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
