//! Authentication API client

use platform_models::{RegisterRequest, TokenResponse, User};

use crate::cache::key::CacheKey;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

impl Dispatcher {
    /// Create an account
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ConsoleError> {
        self.post_public("/auth/register", request).await
    }

    /// Exchange credentials for a token.
    ///
    /// The authentication endpoint expects a form-encoded body.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ConsoleError> {
        self.post_form(
            "/auth/login",
            &[("username", username), ("password", password)],
        )
        .await
    }

    /// Identity behind an explicit token, before it becomes the session's
    pub async fn fetch_current_user_with(&self, token: &str) -> Result<User, ConsoleError> {
        self.get_with_token("/users/me", token).await
    }

    /// Identity behind the current session
    pub async fn current_user(&self) -> Result<User, ConsoleError> {
        self.get_key(&CacheKey::current_user()).await
    }
}
