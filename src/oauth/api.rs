use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::oauth::coordinator::TokenRefresher;
use crate::oauth::store::{RefreshedToken, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    Token,
    RefreshToken,
}

/// Body of `POST {authUrl}/oauth/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtAuthRequest {
    pub grant_type: GrantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl JwtAuthRequest {
    /// Exchange an authorization code plus its PKCE verifier.
    pub fn authorization_code(code: &str, code_verifier: &str) -> Self {
        Self {
            grant_type: GrantType::Token,
            code: Some(code.to_string()),
            code_verifier: Some(code_verifier.to_string()),
            refresh_token: None,
        }
    }

    pub fn refresh(refresh_token: &str) -> Self {
        Self {
            grant_type: GrantType::RefreshToken,
            code: None,
            code_verifier: None,
            refresh_token: Some(refresh_token.to_string()),
        }
    }
}

/// Common shape of the token endpoint's reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "token", alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

impl From<TokenResponse> for RefreshedToken {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
        }
    }
}

/// Thin client for the auth server's token endpoint.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: reqwest::Client,
    auth_url: String,
}

impl AuthApi {
    pub fn new(auth_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), auth_url)
    }

    pub fn with_client(client: reqwest::Client, auth_url: &str) -> Self {
        Self {
            client,
            auth_url: auth_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.auth_url)
    }

    /// POST the grant and decode the reply into whatever shape the caller expects.
    pub async fn login<T: DeserializeOwned>(&self, request: &JwtAuthRequest) -> Result<T, AuthError> {
        let url = self.token_endpoint();
        tracing::debug!(%url, grant_type = ?request.grant_type, "Requesting token");
        let resp = self.client.post(&url).json(request).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Http { status, body });
        }

        Ok(resp.json().await?)
    }
}

/// Refreshes with the `refresh_token` grant using the pair held by a store.
pub struct ApiRefresher<T> {
    api: AuthApi,
    store: Arc<TokenStore<T>>,
}

impl<T> ApiRefresher<T> {
    pub fn new(api: AuthApi, store: Arc<TokenStore<T>>) -> Self {
        Self { api, store }
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> TokenRefresher for ApiRefresher<T> {
    async fn refresh(&self) -> Result<RefreshedToken, AuthError> {
        let refresh_token = self
            .store
            .get_refresh_token()?
            .ok_or(AuthError::MissingRefreshToken)?;
        let resp: TokenResponse = self.api.login(&JwtAuthRequest::refresh(&refresh_token)).await?;
        Ok(resp.into())
    }
}
