pub mod run;
pub mod server;
pub mod set_role;

use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    SetRole(set_role::Args),
}

impl Action {
    /// Execute the action.
    ///
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

async fn connect_pool(dsn: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")
}
