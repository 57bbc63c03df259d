//! Roles, identities, and the persisted user record.
//!
//! Role defaulting happens here and nowhere else: a stored role that is unset
//! or unrecognized resolves to `author` when the record is read, so every
//! `Identity` downstream carries a concrete role.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Author,
    Reviewer,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Author, Self::Reviewer];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Author => "author",
            Self::Reviewer => "reviewer",
        }
    }

    /// Resolve a role read from storage; unset or unknown values become `author`.
    #[must_use]
    pub fn normalize(stored: Option<&str>) -> Self {
        match stored.map(str::trim) {
            None | Some("") => Self::default(),
            Some(value) => value.parse().unwrap_or_else(|err: UnknownRole| {
                warn!(error = %err, "unrecognized stored role, falling back to author");
                Self::default()
            }),
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "author" => Ok(Self::Author),
            "reviewer" => Ok(Self::Reviewer),
            _ => Err(UnknownRole(value.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical `{id, email, name, role}` of a verified user.
#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Persisted account. `password_hash` is `None` for federated-only accounts.
#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_verified: bool,
}

impl User {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password_hash
            .as_deref()
            .is_some_and(|hash| !hash.is_empty())
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "***"))
            .field("role", &self.role)
            .field("is_verified", &self.is_verified)
            .finish()
    }
}

/// Fields for a user that does not exist yet; the store assigns the id.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_verified: bool,
}

impl NewUser {
    /// Account created on first federated sign-in; the provider vouches for the email.
    #[must_use]
    pub fn federated(email: String, name: String) -> Self {
        Self {
            email,
            name,
            password_hash: None,
            role: Role::Author,
            is_verified: true,
        }
    }

    /// Account created from the sign-up form.
    #[must_use]
    pub fn with_password(email: String, name: String, password_hash: String) -> Self {
        Self {
            email,
            name,
            password_hash: Some(password_hash),
            role: Role::Author,
            is_verified: false,
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "***"))
            .field("role", &self.role)
            .field("is_verified", &self.is_verified)
            .finish()
    }
}
