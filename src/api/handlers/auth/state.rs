//! Auth state and configuration.

use std::collections::HashMap;
use std::sync::Arc;

use super::{
    federated::{IdentityProvider, Provider},
    session::SessionIssuer,
    storage::UserStore,
};

const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    public_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_BASE_URL.to_string())
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new(public_base_url: String) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Callback URL registered with a provider.
    #[must_use]
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!("{}/api/auth/callback/{provider}", self.public_base_url)
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    sessions: SessionIssuer,
    providers: HashMap<Provider, Arc<dyn IdentityProvider>>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, store: Arc<dyn UserStore>, sessions: SessionIssuer) -> Self {
        Self {
            config,
            store,
            sessions,
            providers: HashMap::new(),
        }
    }

    /// Register a provider; a later registration for the same kind replaces it.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.provider(), provider);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    #[must_use]
    pub fn provider(&self, provider: Provider) -> Option<&Arc<dyn IdentityProvider>> {
        self.providers.get(&provider)
    }

    /// Providers with client credentials configured.
    #[must_use]
    pub fn enabled_providers(&self) -> Vec<Provider> {
        let mut enabled: Vec<Provider> = self.providers.keys().copied().collect();
        enabled.sort_by_key(|provider| provider.as_str());
        enabled
    }
}
