//! Auth handlers and supporting modules.
//!
//! Two sign-in paths produce the same [`Identity`]:
//!
//! - **Credentials**: email and password checked against an argon2 hash.
//! - **Federated**: an OAuth authorization-code exchange with `google` or
//!   `github`; unknown emails become verified `author` accounts.
//!
//! Either path ends by minting a session token (see [`session`]) carried in
//! the `confgate_session` cookie.
//!
//! Credential failures are reported to clients as a single
//! "authentication failed" response. The specific [`AuthError`] kind is only
//! logged. There is no lockout or rate limiting on sign-in.

pub mod credentials;
pub mod error;
pub mod federated;
pub mod identity;
pub mod password;
pub mod session;
mod state;
pub mod storage;
pub mod types;
mod utils;

pub use credentials::authorize;
pub use error::AuthError;
pub use federated::{
    FederatedProfile, IdentityProvider, OAuthClient, Provider, resolve_federated_identity,
};
pub use identity::{Identity, NewUser, Role, User};
pub use session::{SessionClaims, SessionIssuer, authenticate};
pub use state::{AuthConfig, AuthState};
pub use storage::{CreateOutcome, InMemoryUserStore, PgUserStore, UserStore};
pub(crate) use utils::normalize_email;
