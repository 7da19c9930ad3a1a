use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, RequestBuilder, Response, StatusCode};

use crate::error::AuthError;
use crate::oauth::coordinator::RefreshCoordinator;

/// The next stage of the outbound pipeline.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, AuthError>;
}

#[async_trait]
impl RequestHandler for reqwest::Client {
    async fn handle(&self, request: Request) -> Result<Response, AuthError> {
        Ok(self.execute(request).await?)
    }
}

/// Attaches bearer tokens to outbound requests and recovers once from a 401.
///
/// Statuses other than 401 are handed back untouched. A retried request is
/// sent exactly once and its response is returned as is, so a second 401
/// surfaces to the caller instead of looping.
pub struct AuthInterceptor<H = reqwest::Client> {
    next: H,
    coordinator: Arc<RefreshCoordinator>,
}

impl<H> std::fmt::Debug for AuthInterceptor<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl<H: RequestHandler> AuthInterceptor<H> {
    pub fn new(next: H, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { next, coordinator }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub async fn execute(&self, request: Request) -> Result<Response, AuthError> {
        let token = self.coordinator.current_token()?;
        let retry = request.try_clone();

        let response = self
            .next
            .handle(with_bearer(request, token.as_deref())?)
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(retry) = retry else {
            tracing::warn!("Request body cannot be replayed; returning 401 without refresh");
            return Ok(response);
        };

        tracing::debug!(url = %retry.url(), "Request unauthorized; recovering token");
        let fresh = self.coordinator.refreshed_token().await?;
        self.next.handle(with_bearer(retry, Some(&fresh))?).await
    }
}

impl AuthInterceptor<reqwest::Client> {
    pub fn http(&self) -> &reqwest::Client {
        &self.next
    }

    /// Build and send a request prepared with [`http`](Self::http).
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, AuthError> {
        self.execute(builder.build()?).await
    }
}

/// Set `Authorization: Bearer <token>`, replacing any existing value.
fn with_bearer(mut request: Request, token: Option<&str>) -> Result<Request, AuthError> {
    let Some(token) = token else {
        tracing::debug!("No bearer token available; sending request without Authorization");
        return Ok(request);
    };
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
        AuthError::InvalidToken(format!("token is not a valid header value: {e}"))
    })?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}
