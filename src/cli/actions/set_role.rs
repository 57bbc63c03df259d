use crate::api::handlers::auth::{PgUserStore, Role, UserStore, normalize_email};
use anyhow::{Result, bail};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub email: String,
    pub role: Role,
}

/// Assign a role to an existing account.
///
/// Sessions minted before the change keep the old role until they expire.
///
/// # Errors
/// Returns an error if the account does not exist or the database fails.
pub async fn execute(args: Args) -> Result<()> {
    let store = PgUserStore::new(super::connect_pool(&args.dsn).await?);
    assign_role(&store, &args.email, args.role).await
}

pub(crate) async fn assign_role(store: &dyn UserStore, email: &str, role: Role) -> Result<()> {
    let email = normalize_email(email);
    let Some(mut user) = store.find_user_by_email(&email).await? else {
        bail!("no account registered for {email}");
    };

    if user.role == role {
        info!(user_id = %user.id, %role, "Role unchanged");
        return Ok(());
    }

    user.role = role;
    if !store.save_user(&user).await? {
        bail!("account {email} disappeared before the update");
    }

    info!(user_id = %user.id, %role, "Role updated");
    Ok(())
}
