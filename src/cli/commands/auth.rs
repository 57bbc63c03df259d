use anyhow::bail;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::handlers::auth::session::MIN_SECRET_LENGTH;

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";

#[derive(Debug)]
pub struct Options {
    pub session_secret: SecretString,
    pub session_ttl_seconds: u64,
    pub public_base_url: String,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the session secret is missing or too short.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret = match matches.get_one::<String>(ARG_SESSION_SECRET) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => bail!("missing required argument: --{ARG_SESSION_SECRET}"),
        };
        if secret.len() < MIN_SECRET_LENGTH {
            bail!("--{ARG_SESSION_SECRET} must be at least {MIN_SECRET_LENGTH} bytes");
        }

        Ok(Self {
            session_secret: SecretString::from(secret),
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(30 * 24 * 60 * 60),
            public_base_url: matches
                .get_one::<String>(ARG_PUBLIC_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign session tokens (at least 32 bytes)")
                .env("CONFGATE_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token lifetime in seconds")
                .env("CONFGATE_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Public URL of this service, used for OAuth callbacks and cookie flags")
                .env("CONFGATE_PUBLIC_BASE_URL")
                .default_value("http://localhost:8080"),
        )
}
