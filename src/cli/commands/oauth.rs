use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use tracing::warn;

use crate::api::handlers::auth::Provider;

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GITHUB_CLIENT_ID: &str = "github-client-id";
pub const ARG_GITHUB_CLIENT_SECRET: &str = "github-client-secret";

#[derive(Debug)]
pub struct ClientCredentials {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Default)]
pub struct Options {
    pub clients: Vec<ClientCredentials>,
}

impl Options {
    /// Collect the providers that have both a client id and a secret.
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let clients = [
            (Provider::Google, ARG_GOOGLE_CLIENT_ID, ARG_GOOGLE_CLIENT_SECRET),
            (Provider::Github, ARG_GITHUB_CLIENT_ID, ARG_GITHUB_CLIENT_SECRET),
        ]
        .into_iter()
        .filter_map(
            |(provider, id_arg, secret_arg)| match (get_non_empty(id_arg), get_non_empty(secret_arg)) {
                (Some(client_id), Some(secret)) => Some(ClientCredentials {
                    provider,
                    client_id,
                    client_secret: SecretString::from(secret),
                }),
                (None, None) => None,
                _ => {
                    warn!("{provider} sign-in disabled: --{id_arg} and --{secret_arg} must both be set");
                    None
                }
            },
        )
        .collect();

        Self { clients }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id")
                .env("CONFGATE_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("CONFGATE_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_ID)
                .long(ARG_GITHUB_CLIENT_ID)
                .help("GitHub OAuth client id")
                .env("CONFGATE_GITHUB_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_SECRET)
                .long(ARG_GITHUB_CLIENT_SECRET)
                .help("GitHub OAuth client secret")
                .env("CONFGATE_GITHUB_CLIENT_SECRET")
                .hide_env_values(true),
        )
}
