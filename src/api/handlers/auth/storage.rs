//! User persistence.
//!
//! `email` is the unique lookup key. Emails are normalized before they reach
//! the store, so the unique index on `users.email` is what ultimately decides
//! "one email, one account" when two sign-ins race.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use super::identity::{NewUser, Role, User};
use super::utils::is_unique_violation;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    Conflict,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a user; an existing row with the same email yields `Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome>;

    /// Persist `name`, `role`, and `is_verified` of an existing user.
    ///
    /// Returns `false` if no row matched the id.
    async fn save_user(&self, user: &User) -> Result<bool>;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let password: Option<String> = row.try_get("password")?;
    let role: Option<String> = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        password_hash: password.filter(|hash| !hash.is_empty()),
        role: Role::normalize(role.as_deref()),
        is_verified: row.try_get::<Option<bool>, _>("is_verified")?.unwrap_or(false),
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = "SELECT id, email, name, password, role, is_verified FROM users WHERE email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome> {
        let query = r"
            INSERT INTO users
                (email, name, password, role, is_verified)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, password, role, is_verified
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.password_hash.as_deref().unwrap_or_default())
            .bind(user.role.as_str())
            .bind(user.is_verified)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn save_user(&self, user: &User) -> Result<bool> {
        let query = "UPDATE users SET name = $2, role = $3, is_verified = $4 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.is_verified)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user")?;

        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<()> {
        let query = "SELECT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}

/// Process-local store for tests and local development.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a fully-formed user, keyed by its email.
    pub async fn insert(&self, user: User) {
        self.users.lock().await.insert(user.email.clone(), user);
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.lock().await.get(email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.email) {
            return Ok(CreateOutcome::Conflict);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash.filter(|hash| !hash.is_empty()),
            role: user.role,
            is_verified: user.is_verified,
        };
        users.insert(created.email.clone(), created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn save_user(&self, user: &User) -> Result<bool> {
        let mut users = self.users.lock().await;
        match users.values_mut().find(|existing| existing.id == user.id) {
            Some(existing) => {
                existing.name.clone_from(&user.name);
                existing.role = user.role;
                existing.is_verified = user.is_verified;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Arc;

    #[tokio::test]
    async fn create_then_find() -> Result<()> {
        let store = InMemoryUserStore::new();
        let outcome = store
            .create_user(NewUser::federated(
                "alice@example.com".to_string(),
                "Alice".to_string(),
            ))
            .await?;
        let CreateOutcome::Created(created) = outcome else {
            bail!("expected a new user");
        };
        let found = store.find_user_by_email("alice@example.com").await?;
        assert_eq!(found.map(|user| user.id), Some(created.id));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() -> Result<()> {
        let store = InMemoryUserStore::new();
        let first = NewUser::federated("bob@example.com".to_string(), "Bob".to_string());
        store.create_user(first.clone()).await?;
        let second = store.create_user(first).await?;
        assert!(matches!(second, CreateOutcome::Conflict));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creates_leave_one_account() -> Result<()> {
        let store = Arc::new(InMemoryUserStore::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .create_user(NewUser::federated(
                        "race@example.com".to_string(),
                        "Race".to_string(),
                    ))
                    .await
            }));
        }
        let mut created = 0;
        for task in tasks {
            if matches!(task.await??, CreateOutcome::Created(_)) {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn empty_password_is_stored_as_none() -> Result<()> {
        let store = InMemoryUserStore::new();
        let mut user = NewUser::federated("c@example.com".to_string(), "C".to_string());
        user.password_hash = Some(String::new());
        store.create_user(user).await?;
        let found = store.find_user_by_email("c@example.com").await?;
        assert!(found.is_some_and(|user| !user.has_password()));
        Ok(())
    }

    #[tokio::test]
    async fn save_user_updates_role() -> Result<()> {
        let store = InMemoryUserStore::new();
        let CreateOutcome::Created(mut user) = store
            .create_user(NewUser::federated(
                "dana@example.com".to_string(),
                "Dana".to_string(),
            ))
            .await?
        else {
            bail!("expected a new user");
        };
        user.role = Role::Reviewer;
        assert!(store.save_user(&user).await?);
        let found = store.find_user_by_email("dana@example.com").await?;
        assert_eq!(found.map(|user| user.role), Some(Role::Reviewer));
        Ok(())
    }

    #[tokio::test]
    async fn save_unknown_user_reports_missing() -> Result<()> {
        let store = InMemoryUserStore::new();
        let ghost = User {
            id: Uuid::new_v4(),
            email: "ghost@example.com".to_string(),
            name: String::new(),
            password_hash: None,
            role: Role::Author,
            is_verified: false,
        };
        assert!(!store.save_user(&ghost).await?);
        Ok(())
    }
}
