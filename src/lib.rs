//! # Confgate (conference portal authentication and access control)
//!
//! `confgate` authenticates users of the conference portal, issues signed
//! session tokens, and gates every page request by role before it reaches
//! any page logic.
//!
//! ## Sign-in
//!
//! Users sign in either with an email and password (verified against an
//! argon2 hash) or through a federated identity provider (`google`,
//! `github`). Federated sign-ins create the account on first use with the
//! `author` role and a verified email. One email always maps to one account,
//! whichever path created it first.
//!
//! ## Sessions
//!
//! A successful sign-in mints an HS256 JWT carrying `{id, email, name,
//! role}`. The token is a snapshot: a role change on the account does not
//! reach a token that was already issued until the user signs in again.
//!
//! ## Route guard
//!
//! Every page request passes through a static decision table keyed on the
//! path, the presence of a valid session, and its role. The guard only
//! allows or redirects (to `/login` or `/home`); it never fails a request.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
