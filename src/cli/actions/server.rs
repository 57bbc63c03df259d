use crate::{
    api::{
        self,
        handlers::auth::{AuthConfig, AuthState, OAuthClient, PgUserStore, SessionIssuer},
    },
    cli::commands::oauth::ClientCredentials,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: u64,
    pub public_base_url: String,
    pub oauth_clients: Vec<ClientCredentials>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the session secret is
/// unusable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let pool = super::connect_pool(&args.dsn).await?;

    let config = AuthConfig::new(args.public_base_url);
    let sessions = SessionIssuer::new(&args.session_secret, args.session_ttl_seconds)
        .context("Invalid session secret")?;

    let mut auth_state = AuthState::new(config, Arc::new(PgUserStore::new(pool)), sessions);
    for client in args.oauth_clients {
        let oauth = OAuthClient::new(
            client.provider,
            client.client_id,
            client.client_secret,
            auth_state.config(),
        )
        .with_context(|| format!("Failed to configure {} sign-in", client.provider))?;
        auth_state = auth_state.with_provider(Arc::new(oauth));
    }

    info!(providers = ?auth_state.enabled_providers(), "Auth configured");

    api::new(args.port, Arc::new(auth_state)).await
}
