use std::sync::Arc;

use validator::Validate;

use crate::{
    api::DirectoryApi,
    auth::{TokenScope, TokenStore},
    domain::{Credentials, RegisterRequest},
    error::{AppError, Result},
};

pub struct AuthService {
    api: Arc<dyn DirectoryApi>,
    tokens: Arc<dyn TokenStore>,
}

impl AuthService {
    pub fn new(api: Arc<dyn DirectoryApi>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { api, tokens }
    }

    pub async fn login(&self, scope: TokenScope, credentials: &Credentials) -> Result<()> {
        credentials.validate()?;
        let token = self.api.login(scope, credentials).await?;
        self.store_token(scope, &token).await?;
        tracing::info!("Signed in as {} ({})", credentials.email, scope);
        Ok(())
    }

    pub async fn register(&self, scope: TokenScope, request: &RegisterRequest) -> Result<()> {
        request.validate()?;
        let token = self.api.register(scope, request).await?;
        self.store_token(scope, &token).await?;
        tracing::info!("Registered {} ({})", request.email, scope);
        Ok(())
    }

    /// Forget the token for `scope`. The other scope stays signed in.
    pub async fn logout(&self, scope: TokenScope) -> Result<()> {
        self.tokens.clear(scope).await?;
        tracing::info!("Signed out ({})", scope);
        Ok(())
    }

    pub async fn is_signed_in(&self, scope: TokenScope) -> Result<bool> {
        Ok(self.tokens.get(scope).await?.is_some())
    }

    async fn store_token(&self, scope: TokenScope, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(AppError::UnexpectedResponse("Backend returned an empty token".to_string()));
        }
        self.tokens.set(scope, token).await
    }
}
