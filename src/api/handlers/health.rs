use super::auth::AuthState;
use crate::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Ok,
    Error,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: DatabaseStatus,
}

impl Health {
    fn new(database: DatabaseStatus) -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.database {
            DatabaseStatus::Ok => StatusCode::OK,
            DatabaseStatus::Error => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// `name:version:short-commit`, with an empty commit part for unknown builds.
    fn x_app(&self) -> String {
        let short_hash = self.commit.get(..7).filter(|_| self.commit.len() > 7).unwrap_or("");
        format!("{}:{}:{short_hash}", self.name, self.version)
    }
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "User store is reachable", body = Health),
        (status = 503, description = "User store is unreachable", body = Health)
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let database = match auth_state.store().ping().await {
        Ok(()) => DatabaseStatus::Ok,
        Err(err) => {
            error!("Failed to ping database: {err:#}");
            DatabaseStatus::Error
        }
    };
    debug!(?database, "Health check");

    let health = Health::new(database);

    let mut headers = HeaderMap::new();
    match health.x_app().parse::<HeaderValue>() {
        Ok(value) => {
            headers.insert("X-App", value);
        }
        Err(err) => error!("Failed to parse X-App header: {err}"),
    }

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    (health.status_code(), headers, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_database() {
        assert_eq!(Health::new(DatabaseStatus::Ok).status_code(), StatusCode::OK);
        assert_eq!(
            Health::new(DatabaseStatus::Error).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn x_app_uses_short_commit() {
        let mut health = Health::new(DatabaseStatus::Ok);
        health.commit = "0123456789abcdef".to_string();
        assert_eq!(
            health.x_app(),
            format!("confgate:{}:0123456", env!("CARGO_PKG_VERSION"))
        );

        health.commit = "unknown".to_string();
        assert_eq!(health.x_app(), format!("confgate:{}:", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn database_status_serializes_lowercase() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(Health::new(DatabaseStatus::Error))?;
        assert_eq!(value["database"], "error");
        Ok(())
    }
}
