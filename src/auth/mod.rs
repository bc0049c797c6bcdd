use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

pub mod token_store;

pub use token_store::SqliteTokenStore;

/// Which protected surface a bearer token unlocks. The two scopes are
/// independent: signing out of one never touches the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    User,
    Admin,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::User => "user",
            TokenScope::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(TokenScope::User),
            "admin" => Some(TokenScope::Admin),
            _ => None,
        }
    }

    /// Where the caller should go to obtain a fresh token.
    pub fn login_hint(&self) -> &'static str {
        match self {
            TokenScope::User => "kindred auth login",
            TokenScope::Admin => "kindred auth login --admin",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, scope: TokenScope) -> Result<Option<String>>;
    async fn set(&self, scope: TokenScope, token: &str) -> Result<()>;
    async fn clear(&self, scope: TokenScope) -> Result<()>;
}

/// Process-local token store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<TokenScope, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(scope: TokenScope, token: &str) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(scope, token.to_string());
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, scope: TokenScope) -> Result<Option<String>> {
        Ok(self.tokens.read().await.get(&scope).cloned())
    }

    async fn set(&self, scope: TokenScope, token: &str) -> Result<()> {
        self.tokens.write().await.insert(scope, token.to_string());
        Ok(())
    }

    async fn clear(&self, scope: TokenScope) -> Result<()> {
        self.tokens.write().await.remove(&scope);
        Ok(())
    }
}
